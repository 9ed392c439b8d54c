//! Mirrored expert/family assignment records.
//!
//! # Invariants
//! - Every `AssignedFamily(E, F)` has a matching `AssignedExpert(F, E)`.
//! - Snapshots are copies taken at assignment time; they are refreshed only
//!   by re-assigning.
//! - `meetings` lives on the expert side only.

use crate::model::expert::ExpertId;
use crate::model::family::FamilyId;
use crate::model::report::MeetingRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Active,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilySnapshot {
    pub email: String,
    pub family_name: String,
    pub phone: String,
    pub city: String,
    pub district: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpertSnapshot {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: Option<String>,
}

/// `experts/E/families/F`: the family as seen by its expert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedFamily {
    pub expert_id: ExpertId,
    pub family_id: FamilyId,
    pub family: FamilySnapshot,
    pub assigned_at: i64,
    pub status: AssignmentStatus,
    pub meetings: Vec<MeetingRef>,
}

/// `families/F/assignedExperts/E`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedExpert {
    pub family_id: FamilyId,
    pub expert_id: ExpertId,
    pub expert: ExpertSnapshot,
    pub assigned_at: i64,
    pub status: AssignmentStatus,
}
