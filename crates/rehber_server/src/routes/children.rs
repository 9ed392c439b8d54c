//! Child registry endpoints.

use axum::{extract::State, http::StatusCode, Json};
use rehber_core::model::child::{Child, ChildFields};
use rehber_core::repo::child_repo::ChildUpdate;
use rehber_core::service::child_service::NewChild;
use rehber_core::Capability;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::Caller,
    error::ApiResult,
    extract::{parse_optional_id, require_id, ApiJson, ApiQuery},
    services,
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChildRequest {
    family_id: Option<String>,
    expert_id: Option<String>,
    #[serde(flatten)]
    fields: ChildFields,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChildRequest {
    child_id: Option<String>,
    expert_id: Option<String>,
    old_expert_id: Option<String>,
    #[serde(flatten)]
    fields: ChildFields,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertChildrenQuery {
    expert_id: Option<String>,
}

pub async fn list_children(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Child>>> {
    caller.require(Capability::ViewDirectory)?;
    let children = state
        .with_db(|conn| Ok(services::children(conn).list_children()?))
        .await?;
    Ok(Json(children))
}

pub async fn create_child(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<CreateChildRequest>,
) -> ApiResult<(StatusCode, Json<Child>)> {
    caller.require(Capability::ManageChildren)?;
    let input = NewChild {
        family_id: require_id(payload.family_id.as_deref(), "familyId")?,
        expert_id: parse_optional_id(payload.expert_id.as_deref(), "expertId")?,
        fields: payload.fields,
    };
    let child = state
        .with_db(move |conn| Ok(services::children(conn).create_child(input)?))
        .await?;
    Ok((StatusCode::CREATED, Json(child)))
}

/// `expertId` is mandatory; experts may list their own children.
pub async fn expert_children(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<ExpertChildrenQuery>,
) -> ApiResult<Json<Vec<Child>>> {
    let expert_id = require_id(query.expert_id.as_deref(), "expertId")?;
    caller.require_for(
        expert_id,
        Capability::ViewAssignedFamilies,
        Capability::ViewDirectory,
    )?;
    let children = state
        .with_db(move |conn| Ok(services::children(conn).list_for_expert(expert_id)?))
        .await?;
    Ok(Json(children))
}

pub async fn update_child(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<UpdateChildRequest>,
) -> ApiResult<Json<Value>> {
    caller.require(Capability::ManageChildren)?;
    let update = ChildUpdate {
        child_id: require_id(payload.child_id.as_deref(), "childId")?,
        fields: payload.fields,
        expert_id: parse_optional_id(payload.expert_id.as_deref(), "expertId")?,
        old_expert_id: parse_optional_id(payload.old_expert_id.as_deref(), "oldExpertId")?,
    };
    let child = state
        .with_db(move |conn| Ok(services::children(conn).update_child(&update)?))
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "child updated",
        "child": child,
    })))
}
