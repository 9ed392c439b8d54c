//! Registered child record.
//!
//! # Invariants
//! - A child has exactly one owning family (`family_id`).
//! - `expert_ids` holds at most one expert; the same link is mirrored in that
//!   expert's `child_ids`.

use crate::model::expert::ExpertId;
use crate::model::family::FamilyId;
use crate::model::validation::{
    require_text, validate_amount, validate_optional_date, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ChildId = Uuid;

/// Maximum experts linked to one child.
pub const MAX_CHILD_EXPERTS: usize = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolType {
    Private,
    #[default]
    Public,
}

impl SchoolType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(Self::Private),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

/// Editable child fields. Updates replace the whole set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildFields {
    pub name: String,
    pub birth_date: Option<String>,
    pub school_name: String,
    pub school_type: SchoolType,
    pub special_education: bool,
    pub family_note: String,
    pub admin_note: String,
    pub expert_note: String,
    pub session_fee: Option<f64>,
}

impl ChildFields {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        validate_optional_date("birth_date", self.birth_date.as_deref())?;
        if let Some(fee) = self.session_fee {
            validate_amount("session_fee", fee)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: ChildId,
    #[serde(flatten)]
    pub fields: ChildFields,
    pub family_id: FamilyId,
    pub expert_ids: Vec<ExpertId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Child {
    pub fn new(family_id: FamilyId, fields: ChildFields, expert_id: Option<ExpertId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields,
            family_id,
            expert_ids: expert_id.into_iter().collect(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.fields.validate()?;
        if self.expert_ids.len() > MAX_CHILD_EXPERTS {
            return Err(ValidationError::TooMany {
                field: "expert_ids",
                max: MAX_CHILD_EXPERTS,
            });
        }
        Ok(())
    }

    pub fn expert_id(&self) -> Option<ExpertId> {
        self.expert_ids.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> ChildFields {
        ChildFields {
            name: name.to_string(),
            ..ChildFields::default()
        }
    }

    #[test]
    fn new_child_links_optional_expert() {
        let family = Uuid::new_v4();
        let expert = Uuid::new_v4();

        let unlinked = Child::new(family, fields("Ali"), None);
        assert!(unlinked.expert_ids.is_empty());

        let linked = Child::new(family, fields("Ali"), Some(expert));
        assert_eq!(linked.expert_id(), Some(expert));
        assert!(linked.validate().is_ok());
    }

    #[test]
    fn validate_rejects_second_expert_and_negative_fee() {
        let mut child = Child::new(Uuid::new_v4(), fields("Ali"), Some(Uuid::new_v4()));
        child.expert_ids.push(Uuid::new_v4());
        assert_eq!(
            child.validate().unwrap_err(),
            ValidationError::TooMany {
                field: "expert_ids",
                max: 1
            }
        );

        child.expert_ids.truncate(1);
        child.fields.session_fee = Some(-10.0);
        assert!(child.validate().is_err());
    }

    #[test]
    fn fields_deserialize_with_defaults() {
        let parsed: ChildFields =
            serde_json::from_str(r#"{"name":"Ali","schoolType":"private","sessionFee":750}"#)
                .unwrap();
        assert_eq!(parsed.school_type, SchoolType::Private);
        assert_eq!(parsed.session_fee, Some(750.0));
        assert!(!parsed.special_education);
    }
}
