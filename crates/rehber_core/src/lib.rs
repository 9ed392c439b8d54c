//! Core domain logic for the Rehber family-guidance case service.
//! This crate is the single source of truth for business invariants.

pub mod access;
pub mod credentials;
pub mod db;
pub mod logging;
pub mod media;
pub mod model;
pub mod repo;
pub mod service;

pub use access::{authorize, role_capabilities, AccessError, Capability};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use media::{FsMediaStore, MediaError, MediaStore};
pub use model::identity::{parse_role, Role, UserId, UserIdentity};
pub use repo::{EntityKind, RepoError, RepoResult};
pub use service::{ServiceError, ServiceResult};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
