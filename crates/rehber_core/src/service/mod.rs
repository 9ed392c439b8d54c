//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the HTTP and CLI layers decoupled from storage details.
//!
//! # Invariants
//! - Services never bypass repository validation or transaction contracts.
//! - Authorization is decided by callers through [`crate::access`]; services
//!   only enforce record ownership where the use-case names an owner.

pub mod account_service;
pub mod assignment_service;
pub mod child_service;
pub mod claims_service;
pub mod consistency_service;
pub mod directory_service;
pub mod report_service;

use crate::credentials::CredentialError;
use crate::media::MediaError;
use crate::model::validation::ValidationError;
use crate::repo::{EntityKind, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    NotFound(EntityKind, String),
    Conflict(String),
    /// Email/password pair did not match.
    InvalidCredentials,
    /// Bearer token is unknown or expired.
    Unauthenticated,
    RoleNotAssigned,
    /// Caller does not own the record it addresses.
    NotOwner(String),
    Credential(CredentialError),
    Media(MediaError),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(kind, key) => write!(f, "{kind} not found: {key}"),
            Self::Conflict(details) => write!(f, "{details}"),
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::Unauthenticated => write!(f, "session is missing or expired"),
            Self::RoleNotAssigned => write!(f, "role not assigned"),
            Self::NotOwner(details) => write!(f, "{details}"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::Media(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Credential(err) => Some(err),
            Self::Media(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(kind, key) => Self::NotFound(kind, key),
            RepoError::Duplicate(kind, key) => Self::Conflict(format!("{kind} already exists: {key}")),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CredentialError> for ServiceError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

impl From<MediaError> for ServiceError {
    fn from(value: MediaError) -> Self {
        Self::Media(value)
    }
}

pub(crate) fn not_found(kind: EntityKind, key: impl Display) -> ServiceError {
    ServiceError::NotFound(kind, key.to_string())
}
