//! Report collection repository.
//!
//! # Invariants
//! - `create_report` inserts the report and appends its meeting pointer to
//!   the expert-side assignment in one transaction.
//! - Listing order is `created_at DESC, id ASC`.

use crate::model::expert::ExpertId;
use crate::model::family::FamilyId;
use crate::model::report::{Report, ReportId};
use crate::repo::assignment_repo::{load_assigned_family, store_meetings};
use crate::repo::{
    begin_immediate, bool_to_int, from_json, int_to_bool, parse_uuid, to_json, EntityKind,
    RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

/// Filters for report listing. Empty query lists everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportListQuery {
    pub expert_id: Option<ExpertId>,
    pub family_id: Option<FamilyId>,
    pub approved: Option<bool>,
}

pub trait ReportRepository {
    /// Persists a new report and records it as a meeting on the assignment.
    fn create_report(&self, report: &Report) -> RepoResult<ReportId>;
    fn get_report(&self, id: ReportId) -> RepoResult<Option<Report>>;
    fn list_reports(&self, query: &ReportListQuery) -> RepoResult<Vec<Report>>;
    /// Overwrites the mutable fields of an existing report.
    fn update_report(&self, report: &Report) -> RepoResult<()>;
}

pub struct SqliteReportRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReportRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

const REPORT_COLUMNS: &str = "id, expert_id, expert_email, family_id, family_email, family_name,
     meeting_date, report_content, payment, notes, images, approved, family_approved,
     family_rating, family_comment, created_at, updated_at";

impl ReportRepository for SqliteReportRepository<'_> {
    fn create_report(&self, report: &Report) -> RepoResult<ReportId> {
        report.validate()?;
        let tx = begin_immediate(self.conn)?;
        let assignment = load_assigned_family(&tx, report.expert_id, report.family_id)?
            .ok_or_else(|| {
                RepoError::not_found(
                    EntityKind::Assignment,
                    format!("{}/{}", report.expert_id, report.family_id),
                )
            })?;

        tx.execute(
            "INSERT INTO reports (
                id, expert_id, expert_email, family_id, family_email, family_name,
                meeting_date, report_content, payment, notes, images, approved,
                family_approved, family_rating, family_comment, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17);",
            params![
                report.id.to_string(),
                report.expert_id.to_string(),
                report.expert_email,
                report.family_id.to_string(),
                report.family_email,
                report.family_name,
                report.meeting_date,
                report.report_content,
                report.payment,
                report.notes,
                to_json(&report.images, "reports.images")?,
                bool_to_int(report.approved),
                bool_to_int(report.family_approved),
                report.family_rating,
                report.family_comment,
                report.created_at,
                report.updated_at,
            ],
        )?;

        let mut meetings = assignment.meetings;
        meetings.push(report.meeting_ref());
        store_meetings(&tx, report.expert_id, report.family_id, &meetings)?;

        tx.commit()?;
        Ok(report.id)
    }

    fn get_report(&self, id: ReportId) -> RepoResult<Option<Report>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1;");
        self.conn
            .query_row(&sql, [id.to_string()], |row| Ok(parse_report_row(row)))
            .optional()?
            .transpose()
    }

    fn list_reports(&self, query: &ReportListQuery) -> RepoResult<Vec<Report>> {
        let mut sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(expert_id) = query.expert_id {
            sql.push_str(" AND expert_id = ?");
            bind_values.push(Value::Text(expert_id.to_string()));
        }
        if let Some(family_id) = query.family_id {
            sql.push_str(" AND family_id = ?");
            bind_values.push(Value::Text(family_id.to_string()));
        }
        if let Some(approved) = query.approved {
            sql.push_str(" AND approved = ?");
            bind_values.push(Value::Integer(bool_to_int(approved)));
        }
        sql.push_str(" ORDER BY created_at DESC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut reports = Vec::new();
        while let Some(row) = rows.next()? {
            reports.push(parse_report_row(row)?);
        }
        Ok(reports)
    }

    fn update_report(&self, report: &Report) -> RepoResult<()> {
        report.validate()?;
        let changed = self.conn.execute(
            "UPDATE reports
             SET
                report_content = ?2,
                payment = ?3,
                notes = ?4,
                approved = ?5,
                family_approved = ?6,
                family_rating = ?7,
                family_comment = ?8,
                updated_at = ?9
             WHERE id = ?1;",
            params![
                report.id.to_string(),
                report.report_content,
                report.payment,
                report.notes,
                bool_to_int(report.approved),
                bool_to_int(report.family_approved),
                report.family_rating,
                report.family_comment,
                report.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Report, report.id));
        }
        Ok(())
    }
}

fn parse_report_row(row: &Row<'_>) -> RepoResult<Report> {
    let id_text: String = row.get("id")?;
    let expert_text: String = row.get("expert_id")?;
    let family_text: String = row.get("family_id")?;
    let images: String = row.get("images")?;

    Ok(Report {
        id: parse_uuid(&id_text, "reports.id")?,
        expert_id: parse_uuid(&expert_text, "reports.expert_id")?,
        expert_email: row.get("expert_email")?,
        family_id: parse_uuid(&family_text, "reports.family_id")?,
        family_email: row.get("family_email")?,
        family_name: row.get("family_name")?,
        meeting_date: row.get("meeting_date")?,
        report_content: row.get("report_content")?,
        payment: row.get("payment")?,
        notes: row.get("notes")?,
        images: from_json(&images, "reports.images")?,
        approved: int_to_bool(row.get("approved")?, "reports.approved")?,
        family_approved: int_to_bool(row.get("family_approved")?, "reports.family_approved")?,
        family_rating: row.get("family_rating")?,
        family_comment: row.get("family_comment")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
