use axum::{extract::State, Json};
use rehber_core::model::expert::Expert;
use rehber_core::model::family::Family;
use rehber_core::Capability;

use crate::{auth::Caller, error::ApiResult, services, state::AppState};

pub async fn list_experts(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Expert>>> {
    caller.require(Capability::ViewDirectory)?;
    let experts = state
        .with_db(|conn| Ok(services::directory(conn).list_experts()?))
        .await?;
    Ok(Json(experts))
}

pub async fn list_families(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Family>>> {
    caller.require(Capability::ViewDirectory)?;
    let families = state
        .with_db(|conn| Ok(services::directory(conn).list_families()?))
        .await?;
    Ok(Json(families))
}
