//! Cross-collection reference audit.
//!
//! # Responsibility
//! - Find one-sided references left behind by non-transactional writers.
//! - Apply the forward fix for each finding.
//!
//! # Invariants
//! - `repair` runs scan and fixes in one transaction.
//! - A finding whose fix needs a record that no longer exists is left in
//!   place and not reported as fixed.

use crate::model::child::ChildId;
use crate::model::expert::ExpertId;
use crate::model::family::FamilyId;
use crate::model::report::{MeetingRef, ReportId};
use crate::repo::assignment_repo::{
    load_assigned_family, store_meetings, write_expert_side, write_family_side,
};
use crate::repo::child_repo::load_child;
use crate::repo::expert_repo::{ExpertRepository, SqliteExpertRepository};
use crate::repo::family_repo::{FamilyRepository, SqliteFamilyRepository};
use crate::repo::{
    begin_immediate, now_epoch_ms, parse_uuid, remove_id, to_json, union_id, RepoError,
    RepoResult, EXPERT_CHILD_IDS, FAMILY_CHILD_IDS,
};
use log::warn;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// One-sided reference found by the audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// `experts/E/families/F` exists without `families/F/assignedExperts/E`.
    AssignmentMissingFamilySide {
        expert_id: ExpertId,
        family_id: FamilyId,
    },
    /// `families/F/assignedExperts/E` exists without `experts/E/families/F`.
    AssignmentMissingExpertSide {
        expert_id: ExpertId,
        family_id: FamilyId,
    },
    /// Child links the expert, expert does not list the child.
    ExpertMissingChild {
        expert_id: ExpertId,
        child_id: ChildId,
    },
    /// Expert lists the child, child does not link the expert.
    ChildMissingExpert {
        child_id: ChildId,
        expert_id: ExpertId,
    },
    /// Child names the family as owner, family does not list the child.
    FamilyMissingChild {
        family_id: FamilyId,
        child_id: ChildId,
    },
    /// Meeting pointer whose report does not exist.
    DanglingMeeting {
        expert_id: ExpertId,
        family_id: FamilyId,
        report_id: ReportId,
    },
}

impl Display for Inconsistency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AssignmentMissingFamilySide {
                expert_id,
                family_id,
            } => write!(f, "assignment {expert_id}/{family_id} missing family side"),
            Self::AssignmentMissingExpertSide {
                expert_id,
                family_id,
            } => write!(f, "assignment {expert_id}/{family_id} missing expert side"),
            Self::ExpertMissingChild {
                expert_id,
                child_id,
            } => write!(f, "expert {expert_id} does not list linked child {child_id}"),
            Self::ChildMissingExpert {
                child_id,
                expert_id,
            } => write!(f, "child {child_id} does not link listing expert {expert_id}"),
            Self::FamilyMissingChild {
                family_id,
                child_id,
            } => write!(f, "family {family_id} does not list owned child {child_id}"),
            Self::DanglingMeeting {
                expert_id,
                family_id,
                report_id,
            } => write!(
                f,
                "assignment {expert_id}/{family_id} points at missing report {report_id}"
            ),
        }
    }
}

pub trait ConsistencyRepository {
    fn scan(&self) -> RepoResult<Vec<Inconsistency>>;
    /// Fixes what can be fixed and returns those findings.
    fn repair(&self) -> RepoResult<Vec<Inconsistency>>;
}

pub struct SqliteConsistencyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConsistencyRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ConsistencyRepository for SqliteConsistencyRepository<'_> {
    fn scan(&self) -> RepoResult<Vec<Inconsistency>> {
        scan_all(self.conn)
    }

    fn repair(&self) -> RepoResult<Vec<Inconsistency>> {
        let tx = begin_immediate(self.conn)?;
        let findings = scan_all(&tx)?;
        let mut fixed = Vec::new();
        for finding in findings {
            if apply_fix(&tx, &finding)? {
                fixed.push(finding);
            } else {
                warn!(
                    "event=consistency_repair module=repo status=skipped finding={}",
                    finding
                );
            }
        }
        tx.commit()?;
        Ok(fixed)
    }
}

fn scan_all(conn: &Connection) -> RepoResult<Vec<Inconsistency>> {
    let mut findings = Vec::new();

    for (expert_id, family_id) in query_pairs(
        conn,
        "SELECT ef.expert_id, ef.family_id
         FROM expert_families ef
         WHERE NOT EXISTS (
            SELECT 1 FROM family_experts fe
            WHERE fe.family_id = ef.family_id AND fe.expert_id = ef.expert_id
         )
         ORDER BY ef.expert_id, ef.family_id;",
        "expert_families",
    )? {
        findings.push(Inconsistency::AssignmentMissingFamilySide {
            expert_id,
            family_id,
        });
    }

    for (expert_id, family_id) in query_pairs(
        conn,
        "SELECT fe.expert_id, fe.family_id
         FROM family_experts fe
         WHERE NOT EXISTS (
            SELECT 1 FROM expert_families ef
            WHERE ef.expert_id = fe.expert_id AND ef.family_id = fe.family_id
         )
         ORDER BY fe.expert_id, fe.family_id;",
        "family_experts",
    )? {
        findings.push(Inconsistency::AssignmentMissingExpertSide {
            expert_id,
            family_id,
        });
    }

    for (expert_id, child_id) in query_pairs(
        conn,
        "SELECT j.value, c.id
         FROM children c, json_each(c.expert_ids) j
         WHERE NOT EXISTS (
            SELECT 1 FROM experts e, json_each(e.child_ids) k
            WHERE e.id = j.value AND k.value = c.id
         )
         ORDER BY j.value, c.id;",
        "children.expert_ids",
    )? {
        findings.push(Inconsistency::ExpertMissingChild {
            expert_id,
            child_id,
        });
    }

    for (expert_id, child_id) in query_pairs(
        conn,
        "SELECT e.id, k.value
         FROM experts e, json_each(e.child_ids) k
         WHERE NOT EXISTS (
            SELECT 1 FROM children c, json_each(c.expert_ids) j
            WHERE c.id = k.value AND j.value = e.id
         )
         ORDER BY e.id, k.value;",
        "experts.child_ids",
    )? {
        findings.push(Inconsistency::ChildMissingExpert {
            child_id,
            expert_id,
        });
    }

    for (family_id, child_id) in query_pairs(
        conn,
        "SELECT c.family_id, c.id
         FROM children c
         WHERE NOT EXISTS (
            SELECT 1 FROM families f, json_each(f.child_ids) k
            WHERE f.id = c.family_id AND k.value = c.id
         )
         ORDER BY c.family_id, c.id;",
        "children.family_id",
    )? {
        findings.push(Inconsistency::FamilyMissingChild {
            family_id,
            child_id,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT ef.expert_id, ef.family_id, json_extract(m.value, '$.reportId')
         FROM expert_families ef, json_each(ef.meetings) m
         WHERE NOT EXISTS (
            SELECT 1 FROM reports r WHERE r.id = json_extract(m.value, '$.reportId')
         )
         ORDER BY ef.expert_id, ef.family_id, m.key;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let expert_text: String = row.get(0)?;
        let family_text: String = row.get(1)?;
        let report_text: String = row.get(2)?;
        findings.push(Inconsistency::DanglingMeeting {
            expert_id: parse_uuid(&expert_text, "expert_families.expert_id")?,
            family_id: parse_uuid(&family_text, "expert_families.family_id")?,
            report_id: parse_uuid(&report_text, "expert_families.meetings")?,
        });
    }

    Ok(findings)
}

fn query_pairs(
    conn: &Connection,
    sql: &str,
    column: &str,
) -> RepoResult<Vec<(Uuid, Uuid)>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut pairs = Vec::new();
    while let Some(row) = rows.next()? {
        let left: String = row.get(0)?;
        let right: String = row.get(1)?;
        pairs.push((parse_uuid(&left, column)?, parse_uuid(&right, column)?));
    }
    Ok(pairs)
}

/// Returns `Ok(false)` when the fix needs a record that is gone.
fn apply_fix(conn: &Connection, finding: &Inconsistency) -> RepoResult<bool> {
    match *finding {
        Inconsistency::AssignmentMissingFamilySide {
            expert_id,
            family_id,
        } => {
            let Some(expert) = SqliteExpertRepository::new(conn).get_expert(expert_id)? else {
                return Ok(false);
            };
            let Some(assigned) = load_assigned_family(conn, expert_id, family_id)? else {
                return Ok(false);
            };
            write_family_side(
                conn,
                family_id,
                expert_id,
                &expert.snapshot(),
                assigned.assigned_at,
            )?;
            Ok(true)
        }
        Inconsistency::AssignmentMissingExpertSide {
            expert_id,
            family_id,
        } => {
            let Some(family) = SqliteFamilyRepository::new(conn).get_family(family_id)? else {
                return Ok(false);
            };
            write_expert_side(conn, expert_id, family_id, &family.snapshot(), now_epoch_ms())?;
            Ok(true)
        }
        Inconsistency::ExpertMissingChild {
            expert_id,
            child_id,
        } => skip_missing(union_id(conn, EXPERT_CHILD_IDS, expert_id, child_id)),
        Inconsistency::ChildMissingExpert {
            child_id,
            expert_id,
        } => {
            let linkable = match load_child(conn, child_id)? {
                Some(child) => child.expert_ids.is_empty(),
                None => false,
            };
            if linkable {
                conn.execute(
                    "UPDATE children SET expert_ids = ?2, updated_at = ?3 WHERE id = ?1;",
                    params![
                        child_id.to_string(),
                        to_json(&[expert_id], "children.expert_ids")?,
                        now_epoch_ms(),
                    ],
                )?;
            } else {
                remove_id(conn, EXPERT_CHILD_IDS, expert_id, child_id)?;
            }
            Ok(true)
        }
        Inconsistency::FamilyMissingChild {
            family_id,
            child_id,
        } => skip_missing(union_id(conn, FAMILY_CHILD_IDS, family_id, child_id)),
        Inconsistency::DanglingMeeting {
            expert_id,
            family_id,
            report_id,
        } => {
            let Some(assigned) = load_assigned_family(conn, expert_id, family_id)? else {
                return Ok(false);
            };
            let meetings: Vec<MeetingRef> = assigned
                .meetings
                .into_iter()
                .filter(|meeting| meeting.report_id != report_id)
                .collect();
            store_meetings(conn, expert_id, family_id, &meetings)?;
            Ok(true)
        }
    }
}

fn skip_missing(result: RepoResult<bool>) -> RepoResult<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(RepoError::NotFound(..)) => Ok(false),
        Err(err) => Err(err),
    }
}
