//! Expert collection repository.

use crate::model::expert::{Expert, ExpertId, ExpertProfile};
use crate::repo::{
    from_json, is_unique_violation, now_epoch_ms, parse_uuid, to_json, EntityKind, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait ExpertRepository {
    fn create_expert(&self, expert: &Expert) -> RepoResult<ExpertId>;
    fn get_expert(&self, id: ExpertId) -> RepoResult<Option<Expert>>;
    /// All experts whose email matches case-insensitively.
    fn find_experts_by_email(&self, email: &str) -> RepoResult<Vec<Expert>>;
    /// All experts ordered by last name, first name.
    fn list_experts(&self) -> RepoResult<Vec<Expert>>;
    /// Replaces the embedded profile block.
    fn update_profile(&self, id: ExpertId, profile: &ExpertProfile) -> RepoResult<Expert>;
}

pub struct SqliteExpertRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteExpertRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

const EXPERT_COLUMNS: &str = "id, email, first_name, last_name, birth_date, start_date,
     profile, child_ids, created_at, updated_at";

impl ExpertRepository for SqliteExpertRepository<'_> {
    fn create_expert(&self, expert: &Expert) -> RepoResult<ExpertId> {
        expert.validate()?;
        let now = now_epoch_ms();
        let inserted = self.conn.execute(
            "INSERT INTO experts (
                id, email, first_name, last_name, birth_date, start_date,
                profile, child_ids, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9);",
            params![
                expert.id.to_string(),
                expert.email.trim().to_lowercase(),
                expert.first_name.trim(),
                expert.last_name.trim(),
                expert.birth_date,
                expert.start_date,
                to_json(&expert.profile, "experts.profile")?,
                to_json(&expert.child_ids, "experts.child_ids")?,
                now,
            ],
        );
        match inserted {
            Ok(_) => Ok(expert.id),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::Duplicate(EntityKind::Expert, expert.id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_expert(&self, id: ExpertId) -> RepoResult<Option<Expert>> {
        let sql = format!("SELECT {EXPERT_COLUMNS} FROM experts WHERE id = ?1;");
        self.conn
            .query_row(&sql, [id.to_string()], |row| Ok(parse_expert_row(row)))
            .optional()?
            .transpose()
    }

    fn find_experts_by_email(&self, email: &str) -> RepoResult<Vec<Expert>> {
        let sql = format!(
            "SELECT {EXPERT_COLUMNS} FROM experts
             WHERE email = ?1 COLLATE NOCASE
             ORDER BY created_at ASC, id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([email.trim()])?;
        let mut experts = Vec::new();
        while let Some(row) = rows.next()? {
            experts.push(parse_expert_row(row)?);
        }
        Ok(experts)
    }

    fn list_experts(&self) -> RepoResult<Vec<Expert>> {
        let sql = format!(
            "SELECT {EXPERT_COLUMNS} FROM experts
             ORDER BY last_name COLLATE NOCASE ASC, first_name COLLATE NOCASE ASC, id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut experts = Vec::new();
        while let Some(row) = rows.next()? {
            experts.push(parse_expert_row(row)?);
        }
        Ok(experts)
    }

    fn update_profile(&self, id: ExpertId, profile: &ExpertProfile) -> RepoResult<Expert> {
        let changed = self.conn.execute(
            "UPDATE experts SET profile = ?2, updated_at = ?3 WHERE id = ?1;",
            params![
                id.to_string(),
                to_json(profile, "experts.profile")?,
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Expert, id));
        }
        self.get_expert(id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Expert, id))
    }
}

fn parse_expert_row(row: &Row<'_>) -> RepoResult<Expert> {
    let id_text: String = row.get("id")?;
    let profile_text: String = row.get("profile")?;
    let child_ids_text: String = row.get("child_ids")?;

    Ok(Expert {
        id: parse_uuid(&id_text, "experts.id")?,
        email: row.get("email")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        birth_date: row.get("birth_date")?,
        start_date: row.get("start_date")?,
        profile: from_json(&profile_text, "experts.profile")?,
        child_ids: from_json(&child_ids_text, "experts.child_ids")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
