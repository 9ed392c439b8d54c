use axum::{extract::State, Json};
use rehber_core::model::expert::{Expert, ExpertProfile};
use rehber_core::model::family::{EmergencyContact, Family};
use rehber_core::{Capability, Role, UserIdentity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    auth::Caller,
    error::{ApiError, ApiResult},
    extract::{parse_optional_id, ApiJson},
    services,
    state::AppState,
};

/// Caller's own record, tagged by role.
#[derive(Serialize)]
#[serde(tag = "role", content = "profile", rename_all = "snake_case")]
pub enum Profile {
    Admin(UserIdentity),
    Expert(Expert),
    Family(Family),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertProfileRequest {
    /// Defaults to the caller.
    user_id: Option<String>,
    #[serde(flatten)]
    profile: ExpertProfile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyProfileRequest {
    user_id: Option<String>,
    #[serde(default)]
    emergency_contact: EmergencyContact,
}

pub async fn profile(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Profile>> {
    let uid = caller.uid();
    let profile = match caller.role() {
        Some(Role::Admin) => Profile::Admin(caller.identity),
        Some(Role::Expert) => Profile::Expert(
            state
                .with_db(move |conn| Ok(services::directory(conn).get_expert(uid)?))
                .await?,
        ),
        Some(Role::Family) => Profile::Family(
            state
                .with_db(move |conn| Ok(services::directory(conn).get_family(uid)?))
                .await?,
        ),
        None => return Err(ApiError::Forbidden("role not assigned".to_string())),
    };
    Ok(Json(profile))
}

pub async fn update_expert_profile(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<ExpertProfileRequest>,
) -> ApiResult<Json<Value>> {
    let expert_id = parse_optional_id(payload.user_id.as_deref(), "userId")?.unwrap_or(caller.uid());
    caller.require_for(expert_id, Capability::EditOwnProfile, Capability::ManageAccounts)?;
    let profile = payload.profile;
    let expert = state
        .with_db(move |conn| {
            Ok(services::directory(conn).update_expert_profile(expert_id, profile)?)
        })
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "profile updated",
        "expert": expert,
    })))
}

pub async fn update_family_profile(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<FamilyProfileRequest>,
) -> ApiResult<Json<Value>> {
    let family_id = parse_optional_id(payload.user_id.as_deref(), "userId")?.unwrap_or(caller.uid());
    caller.require_for(family_id, Capability::EditOwnProfile, Capability::ManageAccounts)?;
    let contact = payload.emergency_contact;
    let family = state
        .with_db(move |conn| {
            Ok(services::directory(conn).update_family_profile(family_id, &contact)?)
        })
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "profile updated",
        "family": family,
    })))
}
