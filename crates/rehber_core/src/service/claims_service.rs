//! Role claim read/write.

use crate::model::identity::{Role, UserId, UserIdentity};
use crate::repo::identity_repo::IdentityRepository;
use crate::repo::EntityKind;
use crate::service::{not_found, ServiceResult};
use log::info;

pub struct ClaimsService<I: IdentityRepository> {
    identities: I,
}

impl<I: IdentityRepository> ClaimsService<I> {
    pub fn new(identities: I) -> Self {
        Self { identities }
    }

    /// Overwrites the role claim. Setting the same role twice is a no-op.
    pub fn set_role(&self, uid: UserId, role: Role) -> ServiceResult<UserIdentity> {
        let identity = self.identities.set_role(uid, role)?;
        info!(
            "event=role_set module=service status=ok uid={} role={}",
            uid, role
        );
        Ok(identity)
    }

    pub fn check_by_uid(&self, uid: UserId) -> ServiceResult<UserIdentity> {
        self.identities
            .get_user(uid)?
            .ok_or_else(|| not_found(EntityKind::User, uid))
    }

    pub fn check_by_email(&self, email: &str) -> ServiceResult<UserIdentity> {
        self.identities
            .find_user_by_email(email)?
            .ok_or_else(|| not_found(EntityKind::User, email.trim()))
    }
}
