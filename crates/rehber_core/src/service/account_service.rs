//! Account lifecycle: creation, login, sessions.
//!
//! # Invariants
//! - Expert and family documents use the account uid as their id.
//! - A half-created account (identity without document) is removed again
//!   before the error is returned.
//! - Users without a role claim cannot log in.
//! - Password hashing and verification never touch the database, so callers
//!   sharing one connection can run them without holding it.

use crate::credentials::{hash_password, verify_password};
use crate::model::expert::{Expert, ExpertProfile};
use crate::model::family::{Address, ChildSnapshot, EmergencyContact, Family, Parents};
use crate::model::identity::{validate_password, Role, UserId, UserIdentity};
use crate::model::validation::{normalize_email, optional_text, require_text};
use crate::repo::expert_repo::ExpertRepository;
use crate::repo::family_repo::FamilyRepository;
use crate::repo::identity_repo::IdentityRepository;
use crate::repo::{now_epoch_ms, RepoError};
use crate::service::{ServiceError, ServiceResult};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default bearer session lifetime: 12 hours.
pub const DEFAULT_SESSION_TTL_MS: i64 = 12 * 60 * 60 * 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewExpertAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub start_date: Option<String>,
    pub profile: ExpertProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewFamilyAccount {
    pub email: String,
    pub password: String,
    pub family_name: String,
    pub phone: String,
    pub photo_url: Option<String>,
    pub address: Address,
    pub parents: Parents,
    pub children: Vec<ChildSnapshot>,
    pub notes: String,
    pub emergency_contact: Option<EmergencyContact>,
}

/// Argon2 hash of a password that passed the length check.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn new(password: &str) -> ServiceResult<Self> {
        validate_password(password)?;
        Ok(Self(hash_password(password)?))
    }
}

impl std::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}

/// Stored credentials fetched for a login attempt, not yet checked.
pub struct LoginCandidate {
    identity: UserIdentity,
    password_hash: String,
}

impl LoginCandidate {
    /// Verifies the password, then the role claim.
    pub fn verify(self, password: &str) -> ServiceResult<VerifiedLogin> {
        if !verify_password(password, &self.password_hash)? {
            warn!("event=login module=service status=rejected reason=password_mismatch");
            return Err(ServiceError::InvalidCredentials);
        }
        let identity = self.identity;
        let role = identity.role.ok_or_else(|| {
            warn!(
                "event=login module=service status=rejected reason=role_missing uid={}",
                identity.uid
            );
            ServiceError::RoleNotAssigned
        })?;
        Ok(VerifiedLogin { identity, role })
    }
}

/// A login whose password and role were checked.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    identity: UserIdentity,
    role: Role,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub token: String,
    pub uid: UserId,
    pub email: String,
    pub role: Role,
    pub expires_at: i64,
}

pub struct AccountService<I, E, F>
where
    I: IdentityRepository,
    E: ExpertRepository,
    F: FamilyRepository,
{
    identities: I,
    experts: E,
    families: F,
    session_ttl_ms: i64,
}

impl<I, E, F> AccountService<I, E, F>
where
    I: IdentityRepository,
    E: ExpertRepository,
    F: FamilyRepository,
{
    pub fn new(identities: I, experts: E, families: F) -> Self {
        Self {
            identities,
            experts,
            families,
            session_ttl_ms: DEFAULT_SESSION_TTL_MS,
        }
    }

    pub fn with_session_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.session_ttl_ms = ttl_ms;
        self
    }

    /// Creates the identity with role `expert` and the expert document.
    pub fn create_expert_account(&self, input: &NewExpertAccount) -> ServiceResult<Expert> {
        let expert = expert_document(input)?;
        let password = HashedPassword::new(&input.password)?;
        self.insert_expert(expert, &password)
    }

    /// Same as [`Self::create_expert_account`] with the password hashed
    /// beforehand; `input.password` is ignored.
    pub fn create_expert_account_hashed(
        &self,
        input: &NewExpertAccount,
        password: &HashedPassword,
    ) -> ServiceResult<Expert> {
        self.insert_expert(expert_document(input)?, password)
    }

    /// Creates the identity with role `family` and the family document.
    pub fn create_family_account(&self, input: &NewFamilyAccount) -> ServiceResult<Family> {
        let family = family_document(input)?;
        let password = HashedPassword::new(&input.password)?;
        self.insert_family(family, &password)
    }

    /// Same as [`Self::create_family_account`] with the password hashed
    /// beforehand; `input.password` is ignored.
    pub fn create_family_account_hashed(
        &self,
        input: &NewFamilyAccount,
        password: &HashedPassword,
    ) -> ServiceResult<Family> {
        self.insert_family(family_document(input)?, password)
    }

    /// Creates an admin identity. No entity document is attached.
    pub fn bootstrap_admin(&self, email: &str, password: &str) -> ServiceResult<UserIdentity> {
        let email = normalize_email(email)?;
        let password = HashedPassword::new(password)?;
        let uid = self.insert_identity(&email, &password, Role::Admin)?;
        info!(
            "event=account_create module=service status=ok role=admin uid={}",
            uid
        );
        self.identities
            .get_user(uid)?
            .ok_or(ServiceError::InconsistentState(
                "created admin not found in read-back",
            ))
    }

    pub fn login(&self, email: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let verified = self.login_candidate(email)?.verify(password)?;
        self.open_session(verified)
    }

    /// First login step: the stored credentials for `email`.
    pub fn login_candidate(&self, email: &str) -> ServiceResult<LoginCandidate> {
        let credentials = self
            .identities
            .credentials_by_email(email)?
            .ok_or(ServiceError::InvalidCredentials)?;
        Ok(LoginCandidate {
            identity: credentials.identity,
            password_hash: credentials.password_hash,
        })
    }

    /// Last login step: records the login and issues a session.
    pub fn open_session(&self, verified: VerifiedLogin) -> ServiceResult<LoginOutcome> {
        let VerifiedLogin { identity, role } = verified;
        self.identities.record_login(identity.uid, now_epoch_ms())?;
        let session = self
            .identities
            .create_session(identity.uid, self.session_ttl_ms)?;
        info!(
            "event=login module=service status=ok uid={} role={}",
            identity.uid, role
        );

        Ok(LoginOutcome {
            token: session.token,
            uid: identity.uid,
            email: identity.email,
            role,
            expires_at: session.expires_at,
        })
    }

    /// Resolves a bearer token to the caller identity.
    pub fn authenticate(&self, token: &str) -> ServiceResult<UserIdentity> {
        if token.trim().is_empty() {
            return Err(ServiceError::Unauthenticated);
        }
        self.identities
            .resolve_session(token.trim(), now_epoch_ms())?
            .ok_or(ServiceError::Unauthenticated)
    }

    /// Returns whether a session was revoked.
    pub fn logout(&self, token: &str) -> ServiceResult<bool> {
        Ok(self.identities.revoke_session(token.trim())?)
    }

    fn insert_expert(
        &self,
        mut expert: Expert,
        password: &HashedPassword,
    ) -> ServiceResult<Expert> {
        let uid = self.insert_identity(&expert.email, password, Role::Expert)?;
        expert.id = uid;
        if let Err(err) = self.experts.create_expert(&expert) {
            self.compensate(uid, "expert");
            return Err(err.into());
        }

        info!(
            "event=account_create module=service status=ok role=expert uid={}",
            uid
        );
        self.experts
            .get_expert(uid)?
            .ok_or(ServiceError::InconsistentState(
                "created expert not found in read-back",
            ))
    }

    fn insert_family(
        &self,
        mut family: Family,
        password: &HashedPassword,
    ) -> ServiceResult<Family> {
        let uid = self.insert_identity(&family.email, password, Role::Family)?;
        family.id = uid;
        if let Err(err) = self.families.create_family(&family) {
            self.compensate(uid, "family");
            return Err(err.into());
        }

        info!(
            "event=account_create module=service status=ok role=family uid={}",
            uid
        );
        self.families
            .get_family(uid)?
            .ok_or(ServiceError::InconsistentState(
                "created family not found in read-back",
            ))
    }

    fn insert_identity(
        &self,
        email: &str,
        password: &HashedPassword,
        role: Role,
    ) -> ServiceResult<UserId> {
        match self.identities.create_user(email, &password.0, Some(role)) {
            Ok(uid) => Ok(uid),
            Err(RepoError::Duplicate(..)) => Err(ServiceError::Conflict(format!(
                "email already registered: {email}"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn compensate(&self, uid: UserId, document: &'static str) {
        match self.identities.delete_user(uid) {
            Ok(()) => warn!(
                "event=account_create module=service status=compensated document={} uid={}",
                document, uid
            ),
            Err(err) => error!(
                "event=account_create module=service status=error error_code=compensation_failed document={} uid={} error={}",
                document, uid, err
            ),
        }
    }
}

fn expert_document(input: &NewExpertAccount) -> ServiceResult<Expert> {
    let email = normalize_email(&input.email)?;
    let mut expert = Expert::new(
        Uuid::nil(),
        email,
        require_text("first_name", &input.first_name)?,
        require_text("last_name", &input.last_name)?,
    );
    expert.birth_date = optional_text(input.birth_date.clone());
    expert.start_date = optional_text(input.start_date.clone());
    expert.profile = input.profile.clone().normalized();
    expert.validate()?;
    Ok(expert)
}

fn family_document(input: &NewFamilyAccount) -> ServiceResult<Family> {
    let email = normalize_email(&input.email)?;
    let mut family = Family::new(
        Uuid::nil(),
        email,
        require_text("family_name", &input.family_name)?,
    );
    family.phone = input.phone.trim().to_string();
    family.photo_url = optional_text(input.photo_url.clone());
    family.address = input.address.clone();
    family.parents = input.parents.clone();
    family.children = input.children.clone();
    family.notes = input.notes.clone();
    family.emergency_contact = input.emergency_contact.clone();
    family.validate()?;
    Ok(family)
}
