//! Visit report endpoints.

use axum::{extract::State, http::StatusCode, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rehber_core::model::report::{Report, ReportEdit};
use rehber_core::service::report_service::{FamilyReview, ImageUpload, NewReport};
use rehber_core::{Capability, MediaStore, Role};
use serde::Deserialize;

use crate::{
    auth::Caller,
    error::{ApiError, ApiResult},
    extract::{parse_id, require_id, ApiJson, ApiPath, ApiQuery},
    services,
    state::AppState,
};

/// Base64 payload, optionally as a `data:` url.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    file_name: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    family_id: Option<String>,
    #[serde(default)]
    meeting_date: String,
    #[serde(default)]
    report_content: String,
    #[serde(default)]
    payment: f64,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    images: Vec<ImagePayload>,
}

#[derive(Deserialize)]
pub struct ApprovalQuery {
    approved: Option<bool>,
}

fn decode_image(payload: ImagePayload) -> ApiResult<ImageUpload> {
    let encoded = match payload.data.split_once("base64,") {
        Some((_, rest)) => rest,
        None => payload.data.as_str(),
    };
    let bytes = STANDARD.decode(encoded.trim()).map_err(|err| {
        ApiError::BadRequest(format!("image `{}` is not valid base64: {err}", payload.file_name))
    })?;
    Ok(ImageUpload {
        file_name: payload.file_name,
        bytes,
    })
}

/// Experts see reports they wrote, families see reports about them.
pub async fn list_reports(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Report>>> {
    caller.require(Capability::ViewOwnReports)?;
    let uid = caller.uid();
    let role = caller.role();
    let reports = state
        .with_db(move |conn| {
            let service = services::reports(conn);
            Ok(match role {
                Some(Role::Family) => service.list_for_family(uid)?,
                _ => service.list_for_expert(uid)?,
            })
        })
        .await?;
    Ok(Json(reports))
}

pub async fn create_report(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(payload): ApiJson<CreateReportRequest>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    caller.require(Capability::WriteReports)?;
    let images = payload
        .images
        .into_iter()
        .map(decode_image)
        .collect::<ApiResult<Vec<_>>>()?;
    let input = NewReport {
        family_id: require_id(payload.family_id.as_deref(), "familyId")?,
        meeting_date: payload.meeting_date,
        report_content: payload.report_content,
        payment: payload.payment,
        notes: payload.notes,
        images,
    };
    let expert_id = caller.uid();
    let pending = state
        .with_db(move |conn| Ok(services::reports(conn).prepare_report(expert_id, input)?))
        .await?;
    let media = state.media.clone();
    let staged = AppState::blocking(move || Ok(pending.upload(media.as_ref())?)).await?;
    let media = state.media.clone();
    let report = state
        .with_db(move |conn| {
            let store: &dyn MediaStore = media.as_ref();
            Ok(services::reports(conn).commit_report(staged, store)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn update_report(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<String>,
    ApiJson(edit): ApiJson<ReportEdit>,
) -> ApiResult<Json<Report>> {
    caller.require(Capability::ModerateReports)?;
    let id = parse_id(&id, "report id")?;
    let report = state
        .with_db(move |conn| Ok(services::reports(conn).admin_update(id, &edit)?))
        .await?;
    Ok(Json(report))
}

pub async fn family_review(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<String>,
    ApiJson(review): ApiJson<FamilyReview>,
) -> ApiResult<Json<Report>> {
    caller.require(Capability::ReviewReports)?;
    let id = parse_id(&id, "report id")?;
    let family_id = caller.uid();
    let report = state
        .with_db(move |conn| Ok(services::reports(conn).family_review(family_id, id, &review)?))
        .await?;
    Ok(Json(report))
}

/// Moderation listing, optionally filtered by `approved`.
pub async fn all_reports(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<ApprovalQuery>,
) -> ApiResult<Json<Vec<Report>>> {
    caller.require(Capability::ModerateReports)?;
    let reports = state
        .with_db(move |conn| Ok(services::reports(conn).list_all(query.approved)?))
        .await?;
    Ok(Json(reports))
}
