use axum::{extract::State, http::StatusCode, Json};
use rehber_core::model::expert::Expert;
use rehber_core::model::family::Family;
use rehber_core::service::account_service::{
    HashedPassword, NewExpertAccount, NewFamilyAccount,
};
use rehber_core::Capability;

use crate::{auth::Caller, error::ApiResult, extract::ApiJson, services, state::AppState};

pub async fn create_expert(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<NewExpertAccount>,
) -> ApiResult<(StatusCode, Json<Expert>)> {
    caller.require(Capability::ManageAccounts)?;
    let ttl = state.session_ttl_ms();
    let password = hash_outside_lock(payload.password.clone()).await?;
    let expert = state
        .with_db(move |conn| {
            Ok(services::accounts(conn, ttl).create_expert_account_hashed(&payload, &password)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(expert)))
}

pub async fn create_family(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<NewFamilyAccount>,
) -> ApiResult<(StatusCode, Json<Family>)> {
    caller.require(Capability::ManageAccounts)?;
    let ttl = state.session_ttl_ms();
    let password = hash_outside_lock(payload.password.clone()).await?;
    let family = state
        .with_db(move |conn| {
            Ok(services::accounts(conn, ttl).create_family_account_hashed(&payload, &password)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(family)))
}

async fn hash_outside_lock(password: String) -> ApiResult<HashedPassword> {
    AppState::blocking(move || Ok(HashedPassword::new(&password)?)).await
}
