//! Family record.
//!
//! # Invariants
//! - `id` equals the family's account uid.
//! - `children` is an embedded roster entered at account creation; registered
//!   child records are referenced through `child_ids` instead.

use crate::model::assignment::FamilySnapshot;
use crate::model::child::ChildId;
use crate::model::identity::UserId;
use crate::model::validation::{
    normalize_email, require_text, validate_optional_date, ValidationError,
};
use serde::{Deserialize, Serialize};

pub type FamilyId = UserId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub full_address: String,
    pub district: String,
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Guardian {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parents {
    pub mother: Guardian,
    pub father: Guardian,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

/// Child entry embedded in the family document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildSnapshot {
    pub id: String,
    pub full_name: String,
    pub birth_date: Option<String>,
    pub gender: Gender,
    pub special_conditions: String,
    pub education_status: String,
    pub health_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmergencyContact {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl EmergencyContact {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("emergency_contact.first_name", &self.first_name)?;
        require_text("emergency_contact.last_name", &self.last_name)?;
        require_text("emergency_contact.phone", &self.phone)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: FamilyId,
    pub email: String,
    pub family_name: String,
    pub phone: String,
    pub photo_url: Option<String>,
    pub address: Address,
    pub parents: Parents,
    pub children: Vec<ChildSnapshot>,
    pub child_ids: Vec<ChildId>,
    pub notes: String,
    pub emergency_contact: Option<EmergencyContact>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Family {
    pub fn new(id: FamilyId, email: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            family_name: family_name.into(),
            phone: String::new(),
            photo_url: None,
            address: Address::default(),
            parents: Parents::default(),
            children: Vec::new(),
            child_ids: Vec::new(),
            notes: String::new(),
            emergency_contact: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_email(&self.email)?;
        require_text("family_name", &self.family_name)?;
        for child in &self.children {
            require_text("children.full_name", &child.full_name)?;
            validate_optional_date("children.birth_date", child.birth_date.as_deref())?;
        }
        if let Some(contact) = &self.emergency_contact {
            contact.validate()?;
        }
        Ok(())
    }

    /// Denormalized copy written into `experts/E/families/F`.
    pub fn snapshot(&self) -> FamilySnapshot {
        FamilySnapshot {
            email: self.email.clone(),
            family_name: self.family_name.clone(),
            phone: self.phone.clone(),
            city: self.address.city.clone(),
            district: self.address.district.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}
