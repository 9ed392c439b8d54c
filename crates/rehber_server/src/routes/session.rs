use axum::{extract::State, Json};
use rehber_core::service::account_service::LoginOutcome;
use rehber_core::UserIdentity;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{auth::Caller, error::ApiResult, extract::ApiJson, services, state::AppState};

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginOutcome>> {
    let ttl = state.session_ttl_ms();
    let LoginRequest { email, password } = payload;
    let candidate = state
        .with_db(move |conn| Ok(services::accounts(conn, ttl).login_candidate(&email)?))
        .await?;
    let verified = AppState::blocking(move || Ok(candidate.verify(&password)?)).await?;
    let outcome = state
        .with_db(move |conn| Ok(services::accounts(conn, ttl).open_session(verified)?))
        .await?;
    Ok(Json(outcome))
}

pub async fn logout(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let ttl = state.session_ttl_ms();
    let token = caller.token;
    let revoked = state
        .with_db(move |conn| Ok(services::accounts(conn, ttl).logout(&token)?))
        .await?;
    Ok(Json(json!({ "success": revoked })))
}

pub async fn me(caller: Caller) -> Json<UserIdentity> {
    Json(caller.identity)
}
