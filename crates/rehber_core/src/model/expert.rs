//! Expert record.
//!
//! # Invariants
//! - `id` equals the expert's account uid.
//! - `child_ids` mirrors `Child::expert_ids`; both sides are written together.
//! - Assigned families live in the assignment collection, not on this record.

use crate::model::assignment::ExpertSnapshot;
use crate::model::child::ChildId;
use crate::model::identity::UserId;
use crate::model::validation::{
    normalize_email, require_text, validate_optional_date, ValidationError,
};
use serde::{Deserialize, Serialize};

pub type ExpertId = UserId;

/// One supplementary degree program (double major, minor, open education).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgramEnrollment {
    pub enrolled: bool,
    pub university: String,
    pub department: String,
    pub level: String,
}

/// Completed training or certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub name: String,
    pub institution: String,
    pub date: String,
}

/// Self-maintained profile block, stored as one embedded document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpertProfile {
    pub double_major: ProgramEnrollment,
    pub minor: ProgramEnrollment,
    pub open_education: ProgramEnrollment,
    pub active_institution: String,
    pub city: String,
    pub district: String,
    pub foreign_language: String,
    pub educations: Vec<Education>,
    pub photo_url: String,
}

impl ExpertProfile {
    /// Trims free-text fields and drops education rows with no name.
    pub fn normalized(mut self) -> Self {
        for program in [
            &mut self.double_major,
            &mut self.minor,
            &mut self.open_education,
        ] {
            if !program.enrolled {
                *program = ProgramEnrollment::default();
            }
        }
        self.active_institution = self.active_institution.trim().to_string();
        self.city = self.city.trim().to_string();
        self.district = self.district.trim().to_string();
        self.foreign_language = self.foreign_language.trim().to_string();
        self.photo_url = self.photo_url.trim().to_string();
        self.educations.retain(|education| !education.name.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expert {
    pub id: ExpertId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub start_date: Option<String>,
    pub profile: ExpertProfile,
    pub child_ids: Vec<ChildId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Expert {
    /// Creates an expert document for a freshly created account.
    pub fn new(
        id: ExpertId,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date: None,
            start_date: None,
            profile: ExpertProfile::default(),
            child_ids: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_email(&self.email)?;
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        validate_optional_date("birth_date", self.birth_date.as_deref())?;
        validate_optional_date("start_date", self.start_date.as_deref())?;
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Denormalized copy written into `families/F/assignedExperts/E`.
    pub fn snapshot(&self) -> ExpertSnapshot {
        ExpertSnapshot {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            photo_url: Some(self.profile.photo_url.clone()).filter(|url| !url.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn validate_rejects_blank_names_and_bad_dates() {
        let mut expert = Expert::new(Uuid::new_v4(), "e@x.org", "Elif", " ");
        assert_eq!(
            expert.validate().unwrap_err(),
            ValidationError::Blank("last_name")
        );

        expert.last_name = "Kaya".to_string();
        expert.start_date = Some("2024/01/01".to_string());
        assert!(matches!(
            expert.validate().unwrap_err(),
            ValidationError::InvalidDate { field: "start_date", .. }
        ));
    }

    #[test]
    fn normalized_profile_clears_unenrolled_programs() {
        let profile = ExpertProfile {
            minor: ProgramEnrollment {
                enrolled: false,
                university: "stale".to_string(),
                ..ProgramEnrollment::default()
            },
            educations: vec![
                Education {
                    name: "  ".to_string(),
                    ..Education::default()
                },
                Education {
                    name: "Play therapy".to_string(),
                    ..Education::default()
                },
            ],
            ..ExpertProfile::default()
        }
        .normalized();

        assert_eq!(profile.minor, ProgramEnrollment::default());
        assert_eq!(profile.educations.len(), 1);
    }
}
