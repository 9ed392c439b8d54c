//! Argon2id password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    Hash(String),
    MalformedHash(String),
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash(details) => write!(f, "failed to hash password: {details}"),
            Self::MalformedHash(details) => write!(f, "stored password hash is malformed: {details}"),
        }
    }
}

impl Error for CredentialError {}

/// Hashes a password with a fresh salt; returns a PHC string.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CredentialError::Hash(err.to_string()))
}

/// Returns `Ok(false)` on mismatch.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, CredentialError> {
    let parsed =
        PasswordHash::new(phc).map_err(|err| CredentialError::MalformedHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let phc = hash_password("gizli123").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(verify_password("gizli123", &phc).unwrap());
        assert!(!verify_password("yanlis", &phc).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(CredentialError::MalformedHash(_))
        ));
    }
}
