//! Visit report use-cases.
//!
//! # Responsibility
//! - File reports for assigned families, uploading images first.
//! - Serve per-expert, per-family and moderation listings.
//! - Apply admin edits and family reviews.
//!
//! # Invariants
//! - New reports start unapproved on both sides, without rating or comment.
//! - Images are validated in full before the first upload.
//! - Images stored for a report that is never inserted are deleted again.
//! - A family can only review reports about itself.

use crate::media::{meeting_image_key, MediaStore};
use crate::model::expert::ExpertId;
use crate::model::family::FamilyId;
use crate::model::report::{
    validate_rating, Report, ReportEdit, ReportId, MAX_IMAGE_BYTES, MAX_REPORT_IMAGES,
};
use crate::model::validation::{optional_text, ValidationError};
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::expert_repo::ExpertRepository;
use crate::repo::report_repo::{ReportListQuery, ReportRepository};
use crate::repo::{now_epoch_ms, EntityKind};
use crate::service::{not_found, ServiceError, ServiceResult};
use log::{error, info, warn};
use serde::Deserialize;
use uuid::Uuid;

/// Decoded image attached to a new report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub family_id: FamilyId,
    pub meeting_date: String,
    pub report_content: String,
    pub payment: f64,
    pub notes: String,
    pub images: Vec<ImageUpload>,
}

/// A validated report whose images are not stored yet.
///
/// Uploading needs no database access, so callers holding a shared
/// connection can run [`PendingReport::upload`] without it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReport {
    report: Report,
    images: Vec<ImageUpload>,
}

/// A report with its images stored, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedReport {
    report: Report,
    image_keys: Vec<String>,
}

impl PendingReport {
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Stores every image. On failure the images already stored are removed.
    pub fn upload(self, media: &dyn MediaStore) -> ServiceResult<StagedReport> {
        let PendingReport { mut report, images } = self;
        let mut image_keys = Vec::with_capacity(images.len());
        for image in &images {
            let key = meeting_image_key(now_epoch_ms(), &image.file_name);
            match media.put(&key, &image.bytes) {
                Ok(url) => {
                    report.images.push(url);
                    image_keys.push(key);
                }
                Err(err) => {
                    discard_images(media, &image_keys, report.id);
                    return Err(err.into());
                }
            }
        }
        Ok(StagedReport { report, image_keys })
    }
}

impl StagedReport {
    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn image_keys(&self) -> &[String] {
        &self.image_keys
    }
}

/// Family-side approval with rating.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyReview {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

pub struct ReportService<R, A, E>
where
    R: ReportRepository,
    A: AssignmentRepository,
    E: ExpertRepository,
{
    reports: R,
    assignments: A,
    experts: E,
}

impl<R, A, E> ReportService<R, A, E>
where
    R: ReportRepository,
    A: AssignmentRepository,
    E: ExpertRepository,
{
    pub fn new(reports: R, assignments: A, experts: E) -> Self {
        Self {
            reports,
            assignments,
            experts,
        }
    }

    /// Files a report for an assigned family.
    ///
    /// # Errors
    /// - `NotFound(Expert)` when the expert record is missing.
    /// - `NotFound(Assignment)` when the expert is not assigned to the family.
    /// - `Validation` for bad fields or images; nothing is uploaded then.
    pub fn create_report(
        &self,
        expert_id: ExpertId,
        input: NewReport,
        media: &dyn MediaStore,
    ) -> ServiceResult<Report> {
        let staged = self.prepare_report(expert_id, input)?.upload(media)?;
        self.commit_report(staged, media)
    }

    /// Checks the expert and assignment and validates the report and its
    /// images. Nothing is stored.
    pub fn prepare_report(
        &self,
        expert_id: ExpertId,
        input: NewReport,
    ) -> ServiceResult<PendingReport> {
        let expert = self
            .experts
            .get_expert(expert_id)?
            .ok_or_else(|| not_found(EntityKind::Expert, expert_id))?;
        let assignment = self
            .assignments
            .get_assigned_family(expert_id, input.family_id)?
            .ok_or_else(|| {
                not_found(
                    EntityKind::Assignment,
                    format!("{expert_id}/{}", input.family_id),
                )
            })?;

        let now = now_epoch_ms();
        let report = Report {
            id: Uuid::new_v4(),
            expert_id,
            expert_email: expert.email,
            family_id: input.family_id,
            family_email: assignment.family.email,
            family_name: assignment.family.family_name,
            meeting_date: input.meeting_date.trim().to_string(),
            report_content: input.report_content.trim().to_string(),
            payment: input.payment,
            notes: input.notes.trim().to_string(),
            images: Vec::new(),
            approved: false,
            family_approved: false,
            family_rating: None,
            family_comment: None,
            created_at: now,
            updated_at: now,
        };
        report.validate()?;
        validate_images(&input.images)?;
        Ok(PendingReport {
            report,
            images: input.images,
        })
    }

    /// Inserts a staged report with its meeting pointer. When the insert
    /// fails the staged images are deleted before the error is returned.
    pub fn commit_report(
        &self,
        staged: StagedReport,
        media: &dyn MediaStore,
    ) -> ServiceResult<Report> {
        let StagedReport { report, image_keys } = staged;
        if let Err(err) = self.reports.create_report(&report) {
            discard_images(media, &image_keys, report.id);
            return Err(err.into());
        }
        info!(
            "event=report_create module=service status=ok report_id={} expert_id={} family_id={} images={}",
            report.id,
            report.expert_id,
            report.family_id,
            report.images.len()
        );
        self.get_report(report.id)
    }

    pub fn get_report(&self, id: ReportId) -> ServiceResult<Report> {
        self.reports
            .get_report(id)?
            .ok_or_else(|| not_found(EntityKind::Report, id))
    }

    pub fn list_for_expert(&self, expert_id: ExpertId) -> ServiceResult<Vec<Report>> {
        Ok(self.reports.list_reports(&ReportListQuery {
            expert_id: Some(expert_id),
            ..ReportListQuery::default()
        })?)
    }

    pub fn list_for_family(&self, family_id: FamilyId) -> ServiceResult<Vec<Report>> {
        Ok(self.reports.list_reports(&ReportListQuery {
            family_id: Some(family_id),
            ..ReportListQuery::default()
        })?)
    }

    /// Every report, newest first, optionally filtered by admin approval.
    pub fn list_all(&self, approved: Option<bool>) -> ServiceResult<Vec<Report>> {
        Ok(self.reports.list_reports(&ReportListQuery {
            approved,
            ..ReportListQuery::default()
        })?)
    }

    pub fn admin_update(&self, id: ReportId, edit: &ReportEdit) -> ServiceResult<Report> {
        let mut report = self.get_report(id)?;
        edit.apply_to(&mut report);
        report.updated_at = now_epoch_ms();
        self.reports.update_report(&report)?;
        info!(
            "event=report_update module=service status=ok report_id={} approved={}",
            id, report.approved
        );
        self.get_report(id)
    }

    pub fn family_review(
        &self,
        family_id: FamilyId,
        id: ReportId,
        review: &FamilyReview,
    ) -> ServiceResult<Report> {
        validate_rating(review.rating)?;
        let mut report = self.get_report(id)?;
        if report.family_id != family_id {
            return Err(ServiceError::NotOwner(format!(
                "report {id} does not belong to this family"
            )));
        }

        report.family_approved = true;
        report.family_rating = Some(review.rating);
        report.family_comment = optional_text(review.comment.clone());
        report.updated_at = now_epoch_ms();
        self.reports.update_report(&report)?;
        info!(
            "event=report_review module=service status=ok report_id={} rating={}",
            id, review.rating
        );
        self.get_report(id)
    }
}

fn discard_images(media: &dyn MediaStore, keys: &[String], report_id: ReportId) {
    for key in keys {
        match media.delete(key) {
            Ok(()) => warn!(
                "event=report_create module=service status=compensated report_id={} key={}",
                report_id, key
            ),
            Err(err) => error!(
                "event=report_create module=service status=error error_code=image_cleanup_failed report_id={} key={} error={}",
                report_id, key, err
            ),
        }
    }
}

fn validate_images(images: &[ImageUpload]) -> Result<(), ValidationError> {
    if images.len() > MAX_REPORT_IMAGES {
        return Err(ValidationError::TooMany {
            field: "images",
            max: MAX_REPORT_IMAGES,
        });
    }
    for image in images {
        if image.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::OutOfRange {
                field: "images",
                details: format!(
                    "`{}` is {} bytes; limit is {MAX_IMAGE_BYTES}",
                    image.file_name,
                    image.bytes.len()
                ),
            });
        }
    }
    Ok(())
}
