//! Account identity and role claim.
//!
//! # Invariants
//! - A user carries at most one role claim; the claim is the only place
//!   authorization state lives.
//! - Emails are stored trimmed and lowercased.

use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable account identifier issued by the identity provider.
pub type UserId = Uuid;

/// Minimum password length accepted by the identity provider.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Role claim carried by an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Expert,
    Family,
}

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EXPERT: &str = "expert";
pub const ROLE_FAMILY: &str = "family";

impl Role {
    /// Stable claim value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Expert => ROLE_EXPERT,
            Self::Family => ROLE_FAMILY,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role claim parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleParseError {
    Empty,
    Unsupported(String),
}

impl Display for RoleParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "role must not be empty"),
            Self::Unsupported(value) => {
                write!(f, "unsupported role `{value}`; expected admin|expert|family")
            }
        }
    }
}

impl Error for RoleParseError {}

/// Parses a role claim value. Matching is exact after trim.
pub fn parse_role(value: &str) -> Result<Role, RoleParseError> {
    match value.trim() {
        "" => Err(RoleParseError::Empty),
        ROLE_ADMIN => Ok(Role::Admin),
        ROLE_EXPERT => Ok(Role::Expert),
        ROLE_FAMILY => Ok(Role::Family),
        other => Err(RoleParseError::Unsupported(other.to_string())),
    }
}

/// Identity-provider view of an account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub uid: UserId,
    pub email: String,
    pub role: Option<Role>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds of the last successful login.
    pub last_login_at: Option<i64>,
}

/// Bearer session issued on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub uid: UserId,
    pub created_at: i64,
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::WeakPassword {
            min_len: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}
