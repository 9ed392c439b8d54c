//! Visit report record.
//!
//! # Invariants
//! - `approved` (admin) and `family_approved` (family) are independent flags.
//! - `family_rating`, when present, is within `1..=5`.
//! - A report never carries more than [`MAX_REPORT_IMAGES`] image urls.

use crate::model::expert::ExpertId;
use crate::model::family::FamilyId;
use crate::model::validation::{
    require_text, validate_amount, validate_date, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ReportId = Uuid;

pub const MAX_REPORT_IMAGES: usize = 5;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub expert_id: ExpertId,
    pub expert_email: String,
    pub family_id: FamilyId,
    pub family_email: String,
    pub family_name: String,
    pub meeting_date: String,
    pub report_content: String,
    pub payment: f64,
    pub notes: String,
    pub images: Vec<String>,
    pub approved: bool,
    pub family_approved: bool,
    pub family_rating: Option<u8>,
    pub family_comment: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Report {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_date("meeting_date", &self.meeting_date)?;
        require_text("report_content", &self.report_content)?;
        validate_amount("payment", self.payment)?;
        if self.images.len() > MAX_REPORT_IMAGES {
            return Err(ValidationError::TooMany {
                field: "images",
                max: MAX_REPORT_IMAGES,
            });
        }
        if let Some(rating) = self.family_rating {
            validate_rating(rating)?;
        }
        Ok(())
    }

    /// Pointer appended to the expert-side assignment record.
    pub fn meeting_ref(&self) -> MeetingRef {
        MeetingRef {
            report_id: self.id,
            date: self.meeting_date.clone(),
        }
    }
}

/// `{reportId, date}` entry in an assignment's meeting list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRef {
    pub report_id: ReportId,
    pub date: String,
}

/// Fields an admin may edit on an existing report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportEdit {
    pub report_content: Option<String>,
    pub payment: Option<f64>,
    pub notes: Option<String>,
    pub family_comment: Option<String>,
    pub family_rating: Option<u8>,
    pub approved: Option<bool>,
}

impl ReportEdit {
    pub fn apply_to(&self, report: &mut Report) {
        if let Some(content) = &self.report_content {
            report.report_content = content.clone();
        }
        if let Some(payment) = self.payment {
            report.payment = payment;
        }
        if let Some(notes) = &self.notes {
            report.notes = notes.clone();
        }
        if let Some(comment) = &self.family_comment {
            report.family_comment = Some(comment.clone());
        }
        if let Some(rating) = self.family_rating {
            report.family_rating = Some(rating);
        }
        if let Some(approved) = self.approved {
            report.approved = approved;
        }
    }
}

pub fn validate_rating(rating: u8) -> Result<(), ValidationError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: "family_rating",
            details: format!("expected {MIN_RATING}..={MAX_RATING}, got {rating}"),
        })
    }
}
