//! Role-to-capability authorization gate.
//!
//! # Invariants
//! - Every server handler checks exactly one capability before doing work.
//! - A user without a role claim holds no capability.

use crate::model::identity::Role;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Operation class a caller must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageAccounts,
    ManageRoles,
    AssignFamilies,
    ManageChildren,
    ViewDirectory,
    ViewAssignedFamilies,
    ViewAssignedExperts,
    WriteReports,
    ViewOwnReports,
    ReviewReports,
    ModerateReports,
    EditOwnProfile,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManageAccounts => "manage_accounts",
            Self::ManageRoles => "manage_roles",
            Self::AssignFamilies => "assign_families",
            Self::ManageChildren => "manage_children",
            Self::ViewDirectory => "view_directory",
            Self::ViewAssignedFamilies => "view_assigned_families",
            Self::ViewAssignedExperts => "view_assigned_experts",
            Self::WriteReports => "write_reports",
            Self::ViewOwnReports => "view_own_reports",
            Self::ReviewReports => "review_reports",
            Self::ModerateReports => "moderate_reports",
            Self::EditOwnProfile => "edit_own_profile",
        }
    }

    /// User-facing short description.
    pub fn description(self) -> &'static str {
        match self {
            Self::ManageAccounts => "Create expert and family accounts and edit any profile.",
            Self::ManageRoles => "Read and overwrite role claims.",
            Self::AssignFamilies => "Assign experts to families.",
            Self::ManageChildren => "Register children and change their expert.",
            Self::ViewDirectory => "List all experts, families and children.",
            Self::ViewAssignedFamilies => "List the families assigned to oneself.",
            Self::ViewAssignedExperts => "List the experts assigned to one's family.",
            Self::WriteReports => "File visit reports for assigned families.",
            Self::ViewOwnReports => "List reports one wrote or that concern one's family.",
            Self::ReviewReports => "Approve and rate reports about one's family.",
            Self::ModerateReports => "List every report and edit or approve any report.",
            Self::EditOwnProfile => "Edit one's own profile record.",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::ManageAccounts,
    Capability::ManageRoles,
    Capability::AssignFamilies,
    Capability::ManageChildren,
    Capability::ViewDirectory,
    Capability::ModerateReports,
];

const EXPERT_CAPABILITIES: &[Capability] = &[
    Capability::ViewAssignedFamilies,
    Capability::WriteReports,
    Capability::ViewOwnReports,
    Capability::EditOwnProfile,
];

const FAMILY_CAPABILITIES: &[Capability] = &[
    Capability::ViewAssignedExperts,
    Capability::ViewOwnReports,
    Capability::ReviewReports,
    Capability::EditOwnProfile,
];

/// Capabilities granted to a role.
pub fn role_capabilities(role: Role) -> &'static [Capability] {
    match role {
        Role::Admin => ADMIN_CAPABILITIES,
        Role::Expert => EXPERT_CAPABILITIES,
        Role::Family => FAMILY_CAPABILITIES,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    RoleNotAssigned,
    CapabilityDenied {
        role: Role,
        capability: Capability,
    },
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoleNotAssigned => write!(f, "role not assigned"),
            Self::CapabilityDenied { role, capability } => {
                write!(f, "role `{role}` lacks capability `{capability}`")
            }
        }
    }
}

impl Error for AccessError {}

/// Checks that `role` grants `capability`.
pub fn authorize(role: Option<Role>, capability: Capability) -> Result<(), AccessError> {
    let role = role.ok_or(AccessError::RoleNotAssigned)?;
    if role_capabilities(role).contains(&capability) {
        Ok(())
    } else {
        Err(AccessError::CapabilityDenied { role, capability })
    }
}
