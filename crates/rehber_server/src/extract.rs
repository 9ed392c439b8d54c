//! Extractors whose rejections render as [`ApiError`] bodies.

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    FromRequest, FromRequestParts,
};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

/// Parses a record id from a request field.
pub fn parse_id(value: &str, field: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::BadRequest(format!("{field} is not a valid id")))
}

/// Like [`parse_id`] but treats a missing or blank value as `None`.
pub fn parse_optional_id(value: Option<&str>, field: &str) -> ApiResult<Option<Uuid>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_id(raw, field).map(Some),
    }
}

/// Like [`parse_id`] but rejects a missing or blank value.
pub fn require_id(value: Option<&str>, field: &str) -> ApiResult<Uuid> {
    parse_optional_id(value, field)?
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))
}
