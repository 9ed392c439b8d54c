//! Child collection repository and child/expert/family cross-references.
//!
//! # Responsibility
//! - Persist child records.
//! - Keep `children.expert_ids`, `experts.child_ids` and `families.child_ids`
//!   in agreement on every create and update.
//!
//! # Invariants
//! - `create_child` and `update_child` write every side in one transaction.
//! - After `update_child`, no expert other than the new one lists the child.

use crate::model::child::{Child, ChildFields, ChildId, SchoolType};
use crate::model::expert::ExpertId;
use crate::model::family::FamilyId;
use crate::repo::{
    begin_immediate, bool_to_int, from_json, int_to_bool, now_epoch_ms, parse_uuid, remove_id,
    to_json, union_id, EntityKind, RepoError, RepoResult, EXPERT_CHILD_IDS, FAMILY_CHILD_IDS,
};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

/// Input for a child update.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildUpdate {
    pub child_id: ChildId,
    /// Replaces every editable field.
    pub fields: ChildFields,
    /// New expert; `None` unlinks the child.
    pub expert_id: Option<ExpertId>,
    /// Expert the caller believes is currently linked.
    pub old_expert_id: Option<ExpertId>,
}

pub trait ChildRepository {
    /// Inserts the child and links it to its family and optional expert.
    fn create_child(&self, child: &Child) -> RepoResult<ChildId>;
    fn get_child(&self, id: ChildId) -> RepoResult<Option<Child>>;
    fn list_children(&self) -> RepoResult<Vec<Child>>;
    fn list_children_for_expert(&self, expert_id: ExpertId) -> RepoResult<Vec<Child>>;
    fn list_children_for_family(&self, family_id: FamilyId) -> RepoResult<Vec<Child>>;
    /// Replaces fields and relinks the expert on every side.
    fn update_child(&self, update: &ChildUpdate) -> RepoResult<Child>;
}

pub struct SqliteChildRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteChildRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_children(&self, filter: &str, param: Option<String>) -> RepoResult<Vec<Child>> {
        let sql = format!(
            "SELECT {CHILD_COLUMNS} FROM children {filter}
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = match param {
            Some(value) => stmt.query([value])?,
            None => stmt.query([])?,
        };
        let mut children = Vec::new();
        while let Some(row) = rows.next()? {
            children.push(parse_child_row(row)?);
        }
        Ok(children)
    }
}

const CHILD_COLUMNS: &str = "id, name, birth_date, school_name, school_type, special_education,
     family_note, admin_note, expert_note, session_fee, family_id, expert_ids,
     created_at, updated_at";

impl ChildRepository for SqliteChildRepository<'_> {
    fn create_child(&self, child: &Child) -> RepoResult<ChildId> {
        child.validate()?;
        let tx = begin_immediate(self.conn)?;
        let now = now_epoch_ms();
        let fields = &child.fields;
        tx.execute(
            "INSERT INTO children (
                id, name, birth_date, school_name, school_type, special_education,
                family_note, admin_note, expert_note, session_fee, family_id, expert_ids,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13);",
            params![
                child.id.to_string(),
                fields.name.trim(),
                fields.birth_date,
                fields.school_name.trim(),
                fields.school_type.as_str(),
                bool_to_int(fields.special_education),
                fields.family_note,
                fields.admin_note,
                fields.expert_note,
                fields.session_fee,
                child.family_id.to_string(),
                to_json(&child.expert_ids, "children.expert_ids")?,
                now,
            ],
        )?;

        union_id(&tx, FAMILY_CHILD_IDS, child.family_id, child.id)?;
        for expert_id in &child.expert_ids {
            union_id(&tx, EXPERT_CHILD_IDS, *expert_id, child.id)?;
        }

        tx.commit()?;
        Ok(child.id)
    }

    fn get_child(&self, id: ChildId) -> RepoResult<Option<Child>> {
        load_child(self.conn, id)
    }

    fn list_children(&self) -> RepoResult<Vec<Child>> {
        self.query_children("", None)
    }

    fn list_children_for_expert(&self, expert_id: ExpertId) -> RepoResult<Vec<Child>> {
        self.query_children(
            "WHERE EXISTS (
                SELECT 1 FROM json_each(children.expert_ids) WHERE json_each.value = ?1
             )",
            Some(expert_id.to_string()),
        )
    }

    fn list_children_for_family(&self, family_id: FamilyId) -> RepoResult<Vec<Child>> {
        self.query_children("WHERE family_id = ?1", Some(family_id.to_string()))
    }

    fn update_child(&self, update: &ChildUpdate) -> RepoResult<Child> {
        update.fields.validate()?;
        let tx = begin_immediate(self.conn)?;
        let current = load_child(&tx, update.child_id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Child, update.child_id))?;

        if let Some(expert_id) = update.expert_id {
            union_id(&tx, EXPERT_CHILD_IDS, expert_id, update.child_id)?;
        }

        let mut stale: BTreeSet<ExpertId> = current.expert_ids.iter().copied().collect();
        stale.extend(update.old_expert_id);
        if let Some(expert_id) = update.expert_id {
            stale.remove(&expert_id);
        }
        for expert_id in stale {
            match remove_id(&tx, EXPERT_CHILD_IDS, expert_id, update.child_id) {
                Ok(_) => {}
                Err(RepoError::NotFound(..)) => {
                    warn!(
                        "event=child_unlink module=repo status=skipped reason=expert_missing child_id={} expert_id={}",
                        update.child_id, expert_id
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let fields = &update.fields;
        let expert_ids: Vec<ExpertId> = update.expert_id.into_iter().collect();
        tx.execute(
            "UPDATE children
             SET
                name = ?2,
                birth_date = ?3,
                school_name = ?4,
                school_type = ?5,
                special_education = ?6,
                family_note = ?7,
                admin_note = ?8,
                expert_note = ?9,
                session_fee = ?10,
                expert_ids = ?11,
                updated_at = ?12
             WHERE id = ?1;",
            params![
                update.child_id.to_string(),
                fields.name.trim(),
                fields.birth_date,
                fields.school_name.trim(),
                fields.school_type.as_str(),
                bool_to_int(fields.special_education),
                fields.family_note,
                fields.admin_note,
                fields.expert_note,
                fields.session_fee,
                to_json(&expert_ids, "children.expert_ids")?,
                now_epoch_ms(),
            ],
        )?;

        let updated = load_child(&tx, update.child_id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Child, update.child_id))?;
        tx.commit()?;
        Ok(updated)
    }
}

pub(crate) fn load_child(conn: &Connection, id: ChildId) -> RepoResult<Option<Child>> {
    let sql = format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = ?1;");
    conn.query_row(&sql, [id.to_string()], |row| Ok(parse_child_row(row)))
        .optional()?
        .transpose()
}

pub(crate) fn parse_child_row(row: &Row<'_>) -> RepoResult<Child> {
    let id_text: String = row.get("id")?;
    let family_text: String = row.get("family_id")?;
    let school_type_text: String = row.get("school_type")?;
    let expert_ids_text: String = row.get("expert_ids")?;
    let school_type = SchoolType::parse(&school_type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid school type `{school_type_text}` in children.school_type"
        ))
    })?;

    Ok(Child {
        id: parse_uuid(&id_text, "children.id")?,
        fields: ChildFields {
            name: row.get("name")?,
            birth_date: row.get("birth_date")?,
            school_name: row.get("school_name")?,
            school_type,
            special_education: int_to_bool(
                row.get("special_education")?,
                "children.special_education",
            )?,
            family_note: row.get("family_note")?,
            admin_note: row.get("admin_note")?,
            expert_note: row.get("expert_note")?,
            session_fee: row.get("session_fee")?,
        },
        family_id: parse_uuid(&family_text, "children.family_id")?,
        expert_ids: from_json(&expert_ids_text, "children.expert_ids")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
