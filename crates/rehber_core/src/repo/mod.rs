//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per collection.
//! - Isolate SQLite query details from service orchestration.
//! - Own every multi-row cross-reference write and run it in one transaction.
//!
//! # Invariants
//! - Repository writes validate records before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`) in
//!   addition to DB transport errors.
//! - Id lists stored as JSON text stay duplicate-free in insertion order;
//!   union and removal go through [`union_id`] / [`remove_id`].

pub mod assignment_repo;
pub mod child_repo;
pub mod consistency_repo;
pub mod expert_repo;
pub mod family_repo;
pub mod identity_repo;
pub mod report_repo;

use crate::db::DbError;
use crate::model::validation::ValidationError;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Collection a semantic repository error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Session,
    Expert,
    Family,
    Child,
    Report,
    Assignment,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Session => "session",
            Self::Expert => "expert",
            Self::Family => "family",
            Self::Child => "child",
            Self::Report => "report",
            Self::Assignment => "assignment",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(EntityKind, String),
    Duplicate(EntityKind, String),
    InvalidData(String),
}

impl RepoError {
    pub fn not_found(kind: EntityKind, key: impl Display) -> Self {
        Self::NotFound(kind, key.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(..))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(kind, key) => write!(f, "{kind} not found: {key}"),
            Self::Duplicate(kind, key) => write!(f, "{kind} already exists: {key}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(..) | Self::Duplicate(..) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Starts a `BEGIN IMMEDIATE` transaction on a shared connection handle.
///
/// Repositories borrow the connection immutably so several of them can be
/// built over one handle; nesting is not supported.
pub(crate) fn begin_immediate(conn: &Connection) -> RepoResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(
        conn,
        TransactionBehavior::Immediate,
    )?)
}

/// Primary-key or unique-index violation; trigger aborts do not count.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        ),
        _ => false,
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T, column: &str) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode `{column}`: {err}")))
}

pub(crate) fn from_json<T: DeserializeOwned>(text: &str, column: &str) -> RepoResult<T> {
    serde_json::from_str(text)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in `{column}`: {err}")))
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

/// JSON id-list column on a row keyed by `id`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IdListColumn {
    pub table: &'static str,
    pub column: &'static str,
    pub kind: EntityKind,
}

pub(crate) const EXPERT_CHILD_IDS: IdListColumn = IdListColumn {
    table: "experts",
    column: "child_ids",
    kind: EntityKind::Expert,
};
pub(crate) const FAMILY_CHILD_IDS: IdListColumn = IdListColumn {
    table: "families",
    column: "child_ids",
    kind: EntityKind::Family,
};

pub(crate) fn load_id_list(
    conn: &Connection,
    target: IdListColumn,
    row_id: Uuid,
) -> RepoResult<Option<Vec<Uuid>>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1;",
        target.column, target.table
    );
    let text: Option<String> = conn
        .query_row(&sql, [row_id.to_string()], |row| row.get(0))
        .optional()?;
    text.map(|text| from_json(&text, target.column)).transpose()
}

fn store_id_list(
    conn: &Connection,
    target: IdListColumn,
    row_id: Uuid,
    ids: &[Uuid],
) -> RepoResult<()> {
    let sql = format!(
        "UPDATE {} SET {} = ?2, updated_at = ?3 WHERE id = ?1;",
        target.table, target.column
    );
    conn.execute(
        &sql,
        params![row_id.to_string(), to_json(&ids, target.column)?, now_epoch_ms()],
    )?;
    Ok(())
}

/// Adds `id` to the list unless present. Errors with `NotFound` when the row
/// does not exist. Returns whether the list changed.
pub(crate) fn union_id(
    conn: &Connection,
    target: IdListColumn,
    row_id: Uuid,
    id: Uuid,
) -> RepoResult<bool> {
    let mut ids = load_id_list(conn, target, row_id)?
        .ok_or_else(|| RepoError::not_found(target.kind, row_id))?;
    if ids.contains(&id) {
        return Ok(false);
    }
    ids.push(id);
    store_id_list(conn, target, row_id, &ids)?;
    Ok(true)
}

/// Removes `id` from the list. Errors with `NotFound` when the row does not
/// exist. Returns whether the list changed.
pub(crate) fn remove_id(
    conn: &Connection,
    target: IdListColumn,
    row_id: Uuid,
    id: Uuid,
) -> RepoResult<bool> {
    let mut ids = load_id_list(conn, target, row_id)?
        .ok_or_else(|| RepoError::not_found(target.kind, row_id))?;
    let before = ids.len();
    ids.retain(|current| *current != id);
    if ids.len() == before {
        return Ok(false);
    }
    store_id_list(conn, target, row_id, &ids)?;
    Ok(true)
}
