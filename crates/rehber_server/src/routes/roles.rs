//! Role claim endpoints.

use axum::{extract::State, Json};
use rehber_core::{parse_role, Capability, Role, UserIdentity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    auth::Caller,
    error::{ApiError, ApiResult},
    extract::{require_id, ApiJson},
    services,
    state::AppState,
};

#[derive(Deserialize)]
pub struct SetRoleRequest {
    uid: Option<String>,
    role: Option<String>,
}

#[derive(Deserialize)]
pub struct UidRequest {
    uid: Option<String>,
}

#[derive(Deserialize)]
pub struct UserRoleRequest {
    action: Option<String>,
    email: Option<String>,
    uid: Option<String>,
    role: Option<String>,
}

#[derive(Serialize)]
pub struct RoleView {
    uid: String,
    email: String,
    role: Option<Role>,
}

impl From<UserIdentity> for RoleView {
    fn from(value: UserIdentity) -> Self {
        Self {
            uid: value.uid.to_string(),
            email: value.email,
            role: value.role,
        }
    }
}

fn parse_role_field(role: Option<&str>) -> ApiResult<Role> {
    let raw = role.ok_or_else(|| ApiError::BadRequest("role is required".to_string()))?;
    parse_role(raw).map_err(|err| ApiError::BadRequest(err.to_string()))
}

async fn set_role(state: &AppState, uid: Option<&str>, role: Option<&str>) -> ApiResult<UserIdentity> {
    let uid = require_id(uid, "uid")?;
    let role = parse_role_field(role)?;
    state
        .with_db(move |conn| Ok(services::claims(conn).set_role(uid, role)?))
        .await
}

pub async fn set_user_role(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<SetRoleRequest>,
) -> ApiResult<Json<Value>> {
    caller.require(Capability::ManageRoles)?;
    let identity = set_role(&state, payload.uid.as_deref(), payload.role.as_deref()).await?;
    Ok(Json(json!({
        "success": true,
        "uid": identity.uid,
        "role": identity.role,
    })))
}

/// Combined `check` (by email) and `set` (by uid) endpoint.
pub async fn user_role(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<UserRoleRequest>,
) -> ApiResult<Json<Value>> {
    caller.require(Capability::ManageRoles)?;
    let identity = match payload.action.as_deref().map(str::trim) {
        Some("check") => {
            let email = payload
                .email
                .filter(|email| !email.trim().is_empty())
                .ok_or_else(|| ApiError::BadRequest("email is required".to_string()))?;
            state
                .with_db(move |conn| Ok(services::claims(conn).check_by_email(&email)?))
                .await?
        }
        Some("set") => set_role(&state, payload.uid.as_deref(), payload.role.as_deref()).await?,
        _ => {
            return Err(ApiError::BadRequest(
                "action must be `check` or `set`".to_string(),
            ))
        }
    };
    Ok(Json(json!({ "success": true, "user": RoleView::from(identity) })))
}

/// Own uid for any session, any uid with `ManageRoles`.
pub async fn check_role(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<UidRequest>,
) -> ApiResult<Json<Value>> {
    let uid = require_id(payload.uid.as_deref(), "uid")?;
    if uid != caller.uid() {
        caller.require(Capability::ManageRoles)?;
    }
    let identity = state
        .with_db(move |conn| Ok(services::claims(conn).check_by_uid(uid)?))
        .await?;
    Ok(Json(json!({
        "success": true,
        "uid": identity.uid,
        "role": identity.role,
    })))
}
