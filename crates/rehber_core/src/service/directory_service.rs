//! Expert/family directory reads and self-service profile edits.

use crate::model::expert::{Expert, ExpertId, ExpertProfile};
use crate::model::family::{EmergencyContact, Family, FamilyId};
use crate::repo::expert_repo::ExpertRepository;
use crate::repo::family_repo::FamilyRepository;
use crate::repo::EntityKind;
use crate::service::{not_found, ServiceResult};

pub struct DirectoryService<E, F>
where
    E: ExpertRepository,
    F: FamilyRepository,
{
    experts: E,
    families: F,
}

impl<E, F> DirectoryService<E, F>
where
    E: ExpertRepository,
    F: FamilyRepository,
{
    pub fn new(experts: E, families: F) -> Self {
        Self { experts, families }
    }

    pub fn list_experts(&self) -> ServiceResult<Vec<Expert>> {
        Ok(self.experts.list_experts()?)
    }

    pub fn list_families(&self) -> ServiceResult<Vec<Family>> {
        Ok(self.families.list_families()?)
    }

    pub fn get_expert(&self, id: ExpertId) -> ServiceResult<Expert> {
        self.experts
            .get_expert(id)?
            .ok_or_else(|| not_found(EntityKind::Expert, id))
    }

    pub fn get_family(&self, id: FamilyId) -> ServiceResult<Family> {
        self.families
            .get_family(id)?
            .ok_or_else(|| not_found(EntityKind::Family, id))
    }

    /// Replaces the expert's profile block after normalization.
    pub fn update_expert_profile(
        &self,
        id: ExpertId,
        profile: ExpertProfile,
    ) -> ServiceResult<Expert> {
        Ok(self.experts.update_profile(id, &profile.normalized())?)
    }

    pub fn update_family_profile(
        &self,
        id: FamilyId,
        contact: &EmergencyContact,
    ) -> ServiceResult<Family> {
        let contact = EmergencyContact {
            first_name: contact.first_name.trim().to_string(),
            last_name: contact.last_name.trim().to_string(),
            phone: contact.phone.trim().to_string(),
        };
        Ok(self.families.update_emergency_contact(id, &contact)?)
    }
}
