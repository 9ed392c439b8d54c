//! Mirrored assignment records (`expert_families` / `family_experts`).
//!
//! # Invariants
//! - `upsert_assignment` writes both sides in one transaction.
//! - Re-assigning overwrites snapshot, `assigned_at` and status but keeps the
//!   expert-side meeting list.

use crate::model::assignment::{
    AssignedExpert, AssignedFamily, AssignmentStatus, ExpertSnapshot, FamilySnapshot,
};
use crate::model::expert::{Expert, ExpertId};
use crate::model::family::{Family, FamilyId};
use crate::model::report::MeetingRef;
use crate::repo::{
    begin_immediate, from_json, parse_uuid, to_json, EntityKind, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait AssignmentRepository {
    /// Writes the mirrored active pair for `expert` and `family`.
    fn upsert_assignment(
        &self,
        expert: &Expert,
        family: &Family,
        assigned_at: i64,
    ) -> RepoResult<AssignedFamily>;
    fn get_assigned_family(
        &self,
        expert_id: ExpertId,
        family_id: FamilyId,
    ) -> RepoResult<Option<AssignedFamily>>;
    fn get_assigned_expert(
        &self,
        family_id: FamilyId,
        expert_id: ExpertId,
    ) -> RepoResult<Option<AssignedExpert>>;
    /// Families assigned to an expert, most recent first.
    fn list_assigned_families(&self, expert_id: ExpertId) -> RepoResult<Vec<AssignedFamily>>;
    /// Experts assigned to a family, most recent first.
    fn list_assigned_experts(&self, family_id: FamilyId) -> RepoResult<Vec<AssignedExpert>>;
}

pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn upsert_assignment(
        &self,
        expert: &Expert,
        family: &Family,
        assigned_at: i64,
    ) -> RepoResult<AssignedFamily> {
        let tx = begin_immediate(self.conn)?;
        write_expert_side(&tx, expert.id, family.id, &family.snapshot(), assigned_at)?;
        write_family_side(&tx, family.id, expert.id, &expert.snapshot(), assigned_at)?;
        let stored = load_assigned_family(&tx, expert.id, family.id)?.ok_or_else(|| {
            RepoError::not_found(EntityKind::Assignment, format!("{}/{}", expert.id, family.id))
        })?;
        tx.commit()?;
        Ok(stored)
    }

    fn get_assigned_family(
        &self,
        expert_id: ExpertId,
        family_id: FamilyId,
    ) -> RepoResult<Option<AssignedFamily>> {
        load_assigned_family(self.conn, expert_id, family_id)
    }

    fn get_assigned_expert(
        &self,
        family_id: FamilyId,
        expert_id: ExpertId,
    ) -> RepoResult<Option<AssignedExpert>> {
        self.conn
            .query_row(
                "SELECT family_id, expert_id, expert_snapshot, assigned_at, status
                 FROM family_experts
                 WHERE family_id = ?1 AND expert_id = ?2;",
                params![family_id.to_string(), expert_id.to_string()],
                |row| Ok(parse_assigned_expert_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_assigned_families(&self, expert_id: ExpertId) -> RepoResult<Vec<AssignedFamily>> {
        let mut stmt = self.conn.prepare(
            "SELECT expert_id, family_id, family_snapshot, assigned_at, status, meetings
             FROM expert_families
             WHERE expert_id = ?1
             ORDER BY assigned_at DESC, family_id ASC;",
        )?;
        let mut rows = stmt.query([expert_id.to_string()])?;
        let mut assigned = Vec::new();
        while let Some(row) = rows.next()? {
            assigned.push(parse_assigned_family_row(row)?);
        }
        Ok(assigned)
    }

    fn list_assigned_experts(&self, family_id: FamilyId) -> RepoResult<Vec<AssignedExpert>> {
        let mut stmt = self.conn.prepare(
            "SELECT family_id, expert_id, expert_snapshot, assigned_at, status
             FROM family_experts
             WHERE family_id = ?1
             ORDER BY assigned_at DESC, expert_id ASC;",
        )?;
        let mut rows = stmt.query([family_id.to_string()])?;
        let mut assigned = Vec::new();
        while let Some(row) = rows.next()? {
            assigned.push(parse_assigned_expert_row(row)?);
        }
        Ok(assigned)
    }
}

pub(crate) fn write_expert_side(
    conn: &Connection,
    expert_id: ExpertId,
    family_id: FamilyId,
    snapshot: &FamilySnapshot,
    assigned_at: i64,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO expert_families (expert_id, family_id, family_snapshot, assigned_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(expert_id, family_id) DO UPDATE SET
            family_snapshot = excluded.family_snapshot,
            assigned_at = excluded.assigned_at,
            status = excluded.status;",
        params![
            expert_id.to_string(),
            family_id.to_string(),
            to_json(snapshot, "expert_families.family_snapshot")?,
            assigned_at,
            AssignmentStatus::Active.as_str(),
        ],
    )?;
    Ok(())
}

pub(crate) fn write_family_side(
    conn: &Connection,
    family_id: FamilyId,
    expert_id: ExpertId,
    snapshot: &ExpertSnapshot,
    assigned_at: i64,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO family_experts (family_id, expert_id, expert_snapshot, assigned_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(family_id, expert_id) DO UPDATE SET
            expert_snapshot = excluded.expert_snapshot,
            assigned_at = excluded.assigned_at,
            status = excluded.status;",
        params![
            family_id.to_string(),
            expert_id.to_string(),
            to_json(snapshot, "family_experts.expert_snapshot")?,
            assigned_at,
            AssignmentStatus::Active.as_str(),
        ],
    )?;
    Ok(())
}

pub(crate) fn load_assigned_family(
    conn: &Connection,
    expert_id: ExpertId,
    family_id: FamilyId,
) -> RepoResult<Option<AssignedFamily>> {
    conn.query_row(
        "SELECT expert_id, family_id, family_snapshot, assigned_at, status, meetings
         FROM expert_families
         WHERE expert_id = ?1 AND family_id = ?2;",
        params![expert_id.to_string(), family_id.to_string()],
        |row| Ok(parse_assigned_family_row(row)),
    )
    .optional()?
    .transpose()
}

/// Replaces the meeting list of one expert-side assignment record.
pub(crate) fn store_meetings(
    conn: &Connection,
    expert_id: ExpertId,
    family_id: FamilyId,
    meetings: &[MeetingRef],
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE expert_families SET meetings = ?3 WHERE expert_id = ?1 AND family_id = ?2;",
        params![
            expert_id.to_string(),
            family_id.to_string(),
            to_json(&meetings, "expert_families.meetings")?,
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found(
            EntityKind::Assignment,
            format!("{expert_id}/{family_id}"),
        ));
    }
    Ok(())
}

fn parse_status(value: &str, column: &str) -> RepoResult<AssignmentStatus> {
    AssignmentStatus::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid assignment status `{value}` in {column}"))
    })
}

pub(crate) fn parse_assigned_family_row(row: &Row<'_>) -> RepoResult<AssignedFamily> {
    let expert_text: String = row.get("expert_id")?;
    let family_text: String = row.get("family_id")?;
    let snapshot: String = row.get("family_snapshot")?;
    let status: String = row.get("status")?;
    let meetings: String = row.get("meetings")?;

    Ok(AssignedFamily {
        expert_id: parse_uuid(&expert_text, "expert_families.expert_id")?,
        family_id: parse_uuid(&family_text, "expert_families.family_id")?,
        family: from_json(&snapshot, "expert_families.family_snapshot")?,
        assigned_at: row.get("assigned_at")?,
        status: parse_status(&status, "expert_families.status")?,
        meetings: from_json(&meetings, "expert_families.meetings")?,
    })
}

pub(crate) fn parse_assigned_expert_row(row: &Row<'_>) -> RepoResult<AssignedExpert> {
    let family_text: String = row.get("family_id")?;
    let expert_text: String = row.get("expert_id")?;
    let snapshot: String = row.get("expert_snapshot")?;
    let status: String = row.get("status")?;

    Ok(AssignedExpert {
        family_id: parse_uuid(&family_text, "family_experts.family_id")?,
        expert_id: parse_uuid(&expert_text, "family_experts.expert_id")?,
        expert: from_json(&snapshot, "family_experts.expert_snapshot")?,
        assigned_at: row.get("assigned_at")?,
        status: parse_status(&status, "family_experts.status")?,
    })
}
