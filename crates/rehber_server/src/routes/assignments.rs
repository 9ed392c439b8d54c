use axum::{extract::State, Json};
use rehber_core::model::assignment::{AssignedExpert, AssignedFamily};
use rehber_core::service::assignment_service::AssignmentOutcome;
use rehber_core::Capability;
use serde::Deserialize;

use crate::{
    auth::Caller,
    error::{ApiError, ApiResult},
    extract::{parse_optional_id, ApiJson, ApiQuery},
    services,
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    #[serde(default)]
    expert_email: String,
    /// Comma separated.
    #[serde(default)]
    family_emails: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertQuery {
    expert_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyQuery {
    family_id: Option<String>,
}

pub async fn assign_families(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<AssignRequest>,
) -> ApiResult<Json<AssignmentOutcome>> {
    caller.require(Capability::AssignFamilies)?;
    if payload.expert_email.trim().is_empty() || payload.family_emails.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "expertEmail and familyEmails are required".to_string(),
        ));
    }
    let outcome = state
        .with_db(move |conn| {
            Ok(services::assignments(conn)
                .assign_families(&payload.expert_email, &payload.family_emails)?)
        })
        .await?;
    Ok(Json(outcome))
}

/// Caller's own families, or any expert's with `ViewDirectory`.
pub async fn expert_families(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<ExpertQuery>,
) -> ApiResult<Json<Vec<AssignedFamily>>> {
    let expert_id = parse_optional_id(query.expert_id.as_deref(), "expertId")?.unwrap_or(caller.uid());
    caller.require_for(
        expert_id,
        Capability::ViewAssignedFamilies,
        Capability::ViewDirectory,
    )?;
    let families = state
        .with_db(move |conn| Ok(services::assignments(conn).families_for_expert(expert_id)?))
        .await?;
    Ok(Json(families))
}

/// Caller's own experts, or any family's with `ViewDirectory`.
pub async fn family_experts(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<FamilyQuery>,
) -> ApiResult<Json<Vec<AssignedExpert>>> {
    let family_id = parse_optional_id(query.family_id.as_deref(), "familyId")?.unwrap_or(caller.uid());
    caller.require_for(
        family_id,
        Capability::ViewAssignedExperts,
        Capability::ViewDirectory,
    )?;
    let experts = state
        .with_db(move |conn| Ok(services::assignments(conn).experts_for_family(family_id)?))
        .await?;
    Ok(Json(experts))
}
