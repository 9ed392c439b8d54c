//! Identity provider adapter: accounts, role claims and bearer sessions.
//!
//! # Invariants
//! - Emails are unique case-insensitively.
//! - Password hashes never leave this module except through
//!   [`IdentityRepository::credentials_by_email`].
//! - Expired sessions never resolve and are purged when a new one is issued.

use crate::model::identity::{parse_role, Role, Session, UserId, UserIdentity};
use crate::repo::{
    begin_immediate, is_unique_violation, now_epoch_ms, parse_uuid, EntityKind, RepoError,
    RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// Stored login material for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identity: UserIdentity,
    pub password_hash: String,
}

pub trait IdentityRepository {
    /// Creates an account and returns its uid. Duplicate email yields
    /// `RepoError::Duplicate`.
    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Option<Role>,
    ) -> RepoResult<UserId>;
    /// Removes an account and its sessions.
    fn delete_user(&self, uid: UserId) -> RepoResult<()>;
    fn get_user(&self, uid: UserId) -> RepoResult<Option<UserIdentity>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserIdentity>>;
    fn credentials_by_email(&self, email: &str) -> RepoResult<Option<Credentials>>;
    /// Overwrites the role claim.
    fn set_role(&self, uid: UserId, role: Role) -> RepoResult<UserIdentity>;
    fn record_login(&self, uid: UserId, at_ms: i64) -> RepoResult<()>;
    fn create_session(&self, uid: UserId, ttl_ms: i64) -> RepoResult<Session>;
    /// Resolves a live session token to its identity.
    fn resolve_session(&self, token: &str, now_ms: i64) -> RepoResult<Option<UserIdentity>>;
    fn revoke_session(&self, token: &str) -> RepoResult<bool>;
}

pub struct SqliteIdentityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

const USER_COLUMNS: &str = "uid, email, role, created_at, last_login_at";

impl IdentityRepository for SqliteIdentityRepository<'_> {
    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Option<Role>,
    ) -> RepoResult<UserId> {
        let uid = Uuid::new_v4();
        let email = email.trim().to_lowercase();
        let inserted = self.conn.execute(
            "INSERT INTO users (uid, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                uid.to_string(),
                email,
                password_hash,
                role.map(Role::as_str),
                now_epoch_ms(),
            ],
        );
        match inserted {
            Ok(_) => Ok(uid),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::Duplicate(EntityKind::User, email))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete_user(&self, uid: UserId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE uid = ?1;", [uid.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::User, uid));
        }
        Ok(())
    }

    fn get_user(&self, uid: UserId) -> RepoResult<Option<UserIdentity>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1;");
        self.conn
            .query_row(&sql, [uid.to_string()], |row| Ok(parse_identity_row(row)))
            .optional()?
            .transpose()
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserIdentity>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE;");
        self.conn
            .query_row(&sql, [email.trim()], |row| Ok(parse_identity_row(row)))
            .optional()?
            .transpose()
    }

    fn credentials_by_email(&self, email: &str) -> RepoResult<Option<Credentials>> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1 COLLATE NOCASE;"
        );
        self.conn
            .query_row(&sql, [email.trim()], |row| {
                Ok(parse_identity_row(row).and_then(|identity| {
                    Ok(Credentials {
                        identity,
                        password_hash: row.get("password_hash")?,
                    })
                }))
            })
            .optional()?
            .transpose()
    }

    fn set_role(&self, uid: UserId, role: Role) -> RepoResult<UserIdentity> {
        let changed = self.conn.execute(
            "UPDATE users SET role = ?2 WHERE uid = ?1;",
            params![uid.to_string(), role.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::User, uid));
        }
        self.get_user(uid)?
            .ok_or_else(|| RepoError::not_found(EntityKind::User, uid))
    }

    fn record_login(&self, uid: UserId, at_ms: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET last_login_at = ?2 WHERE uid = ?1;",
            params![uid.to_string(), at_ms],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::User, uid));
        }
        Ok(())
    }

    fn create_session(&self, uid: UserId, ttl_ms: i64) -> RepoResult<Session> {
        let created_at = now_epoch_ms();
        let session = Session {
            token: new_session_token(),
            uid,
            created_at,
            expires_at: created_at.saturating_add(ttl_ms),
        };
        let tx = begin_immediate(self.conn)?;
        let purged = tx.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1;",
            [created_at],
        )?;
        tx.execute(
            "INSERT INTO sessions (token, uid, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                session.token,
                uid.to_string(),
                session.created_at,
                session.expires_at,
            ],
        )?;
        tx.commit()?;
        if purged > 0 {
            debug!(
                "event=session_purge module=repo status=ok purged={}",
                purged
            );
        }
        Ok(session)
    }

    fn resolve_session(&self, token: &str, now_ms: i64) -> RepoResult<Option<UserIdentity>> {
        self.conn
            .query_row(
                "SELECT u.uid, u.email, u.role, u.created_at, u.last_login_at
                 FROM sessions s
                 INNER JOIN users u ON u.uid = s.uid
                 WHERE s.token = ?1
                   AND s.expires_at > ?2;",
                params![token, now_ms],
                |row| Ok(parse_identity_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn revoke_session(&self, token: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE token = ?1;", [token])?;
        Ok(changed > 0)
    }
}

fn new_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn parse_identity_row(row: &Row<'_>) -> RepoResult<UserIdentity> {
    let uid_text: String = row.get("uid")?;
    let role_text: Option<String> = row.get("role")?;
    let role = role_text
        .map(|value| {
            parse_role(&value).map_err(|err| {
                RepoError::InvalidData(format!("invalid role in users.role: {err}"))
            })
        })
        .transpose()?;

    Ok(UserIdentity {
        uid: parse_uuid(&uid_text, "users.uid")?,
        email: row.get("email")?,
        role,
        created_at: row.get("created_at")?,
        last_login_at: row.get("last_login_at")?,
    })
}
