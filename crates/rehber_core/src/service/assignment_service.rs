//! Expert-to-family assignment fan-out.
//!
//! # Responsibility
//! - Resolve one expert and a comma-separated family email list.
//! - Write one mirrored assignment pair per resolved family.
//!
//! # Invariants
//! - An unresolved expert aborts before any write.
//! - Unresolved family emails are skipped and reported, never fatal.
//! - Each pair is atomic; the batch is not.

use crate::model::assignment::{AssignedExpert, AssignedFamily};
use crate::model::expert::ExpertId;
use crate::model::family::FamilyId;
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::expert_repo::ExpertRepository;
use crate::repo::family_repo::FamilyRepository;
use crate::repo::{now_epoch_ms, EntityKind};
use crate::service::{not_found, ServiceResult};
use log::{info, warn};
use serde::Serialize;

/// Per-family outcome of one `assign_families` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    pub expert_id: ExpertId,
    pub assigned: Vec<FamilyId>,
    /// Emails that matched no family.
    pub skipped: Vec<String>,
}

pub struct AssignmentService<E, F, A>
where
    E: ExpertRepository,
    F: FamilyRepository,
    A: AssignmentRepository,
{
    experts: E,
    families: F,
    assignments: A,
}

impl<E, F, A> AssignmentService<E, F, A>
where
    E: ExpertRepository,
    F: FamilyRepository,
    A: AssignmentRepository,
{
    pub fn new(experts: E, families: F, assignments: A) -> Self {
        Self {
            experts,
            families,
            assignments,
        }
    }

    pub fn assign_families(
        &self,
        expert_email: &str,
        family_emails: &str,
    ) -> ServiceResult<AssignmentOutcome> {
        let expert_email = expert_email.trim();
        let mut matches = self.experts.find_experts_by_email(expert_email)?;
        if matches.len() != 1 {
            if matches.len() > 1 {
                warn!(
                    "event=assign_families module=service status=rejected reason=ambiguous_expert matches={}",
                    matches.len()
                );
            }
            return Err(not_found(EntityKind::Expert, expert_email));
        }
        let expert = matches.remove(0);

        let mut outcome = AssignmentOutcome {
            expert_id: expert.id,
            assigned: Vec::new(),
            skipped: Vec::new(),
        };
        for email in parse_family_emails(family_emails) {
            let Some(family) = self.families.find_families_by_email(&email)?.into_iter().next()
            else {
                outcome.skipped.push(email);
                continue;
            };
            self.assignments
                .upsert_assignment(&expert, &family, now_epoch_ms())?;
            if !outcome.assigned.contains(&family.id) {
                outcome.assigned.push(family.id);
            }
        }

        info!(
            "event=assign_families module=service status=ok expert_id={} assigned={} skipped={}",
            expert.id,
            outcome.assigned.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    pub fn families_for_expert(&self, expert_id: ExpertId) -> ServiceResult<Vec<AssignedFamily>> {
        Ok(self.assignments.list_assigned_families(expert_id)?)
    }

    pub fn experts_for_family(&self, family_id: FamilyId) -> ServiceResult<Vec<AssignedExpert>> {
        Ok(self.assignments.list_assigned_experts(family_id)?)
    }
}

/// Splits on commas, trims, drops empty entries and repeated emails.
pub fn parse_family_emails(input: &str) -> Vec<String> {
    let mut emails: Vec<String> = Vec::new();
    for entry in input.split(',') {
        let email = entry.trim().to_lowercase();
        if !email.is_empty() && !emails.contains(&email) {
            emails.push(email);
        }
    }
    emails
}
