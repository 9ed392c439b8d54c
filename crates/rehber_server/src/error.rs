use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use rehber_core::{AccessError, ServiceError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("event=request_failed module=server status=error detail={detail}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Validation(_) => ApiError::BadRequest(value.to_string()),
            ServiceError::NotFound(..) => ApiError::NotFound(value.to_string()),
            ServiceError::Conflict(_) => ApiError::Conflict(value.to_string()),
            ServiceError::InvalidCredentials | ServiceError::Unauthenticated => {
                ApiError::Unauthorized(value.to_string())
            }
            ServiceError::RoleNotAssigned | ServiceError::NotOwner(_) => {
                ApiError::Forbidden(value.to_string())
            }
            ServiceError::Credential(_)
            | ServiceError::Media(_)
            | ServiceError::Repo(_)
            | ServiceError::InconsistentState(_) => ApiError::Internal(value.to_string()),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(value: AccessError) -> Self {
        ApiError::Forbidden(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehber_core::model::validation::ValidationError;
    use rehber_core::{Capability, EntityKind, Role};

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (
                ServiceError::Validation(ValidationError::Blank("email")),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::NotFound(EntityKind::Expert, "x@y.z".into()),
                StatusCode::NOT_FOUND,
            ),
            (ServiceError::Conflict("dup".into()), StatusCode::CONFLICT),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ServiceError::RoleNotAssigned, StatusCode::FORBIDDEN),
            (ServiceError::NotOwner("r1".into()), StatusCode::FORBIDDEN),
            (
                ServiceError::InconsistentState("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn access_denial_is_forbidden() {
        let err = ApiError::from(AccessError::CapabilityDenied {
            role: Role::Family,
            capability: Capability::ManageAccounts,
        });
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
