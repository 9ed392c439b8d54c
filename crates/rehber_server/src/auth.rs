//! Bearer-session caller extraction and capability checks.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use rehber_core::{authorize, Capability, Role, UserId, UserIdentity};

use crate::{
    error::{ApiError, ApiResult},
    services,
    state::AppState,
};

/// Authenticated caller resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: UserIdentity,
    pub token: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let ttl = state.session_ttl_ms();
        let lookup = token.clone();
        let identity = state
            .with_db(move |conn| Ok(services::accounts(conn, ttl).authenticate(&lookup)?))
            .await?;
        Ok(Caller { identity, token })
    }
}

impl Caller {
    pub fn uid(&self) -> UserId {
        self.identity.uid
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.role
    }

    pub fn require(&self, capability: Capability) -> ApiResult<()> {
        authorize(self.identity.role, capability)?;
        Ok(())
    }

    /// `own` when acting on the caller's record, `other` otherwise.
    pub fn require_for(&self, target: UserId, own: Capability, other: Capability) -> ApiResult<()> {
        if target == self.uid() {
            self.require(own)
        } else {
            self.require(other)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> ApiResult<String> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("malformed authorization header".to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
    Ok(token.to_string())
}
