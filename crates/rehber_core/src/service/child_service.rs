//! Child registration and expert relinking.

use crate::model::child::{Child, ChildFields, ChildId};
use crate::model::expert::ExpertId;
use crate::model::family::FamilyId;
use crate::repo::child_repo::{ChildRepository, ChildUpdate};
use crate::repo::EntityKind;
use crate::service::{not_found, ServiceError, ServiceResult};
use log::info;

/// Input for child registration.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChild {
    pub family_id: FamilyId,
    pub expert_id: Option<ExpertId>,
    pub fields: ChildFields,
}

pub struct ChildService<C: ChildRepository> {
    children: C,
}

impl<C: ChildRepository> ChildService<C> {
    pub fn new(children: C) -> Self {
        Self { children }
    }

    /// Creates the child and links it to its family and optional expert.
    pub fn create_child(&self, input: NewChild) -> ServiceResult<Child> {
        let child = Child::new(input.family_id, input.fields, input.expert_id);
        let child_id = self.children.create_child(&child)?;
        info!(
            "event=child_create module=service status=ok child_id={} family_id={} linked_expert={}",
            child_id,
            input.family_id,
            input.expert_id.is_some()
        );
        self.children
            .get_child(child_id)?
            .ok_or(ServiceError::InconsistentState(
                "created child not found in read-back",
            ))
    }

    /// Replaces child fields and moves the child to `expert_id`.
    pub fn update_child(&self, update: &ChildUpdate) -> ServiceResult<Child> {
        let child = self.children.update_child(update)?;
        info!(
            "event=child_update module=service status=ok child_id={} linked_expert={}",
            child.id,
            child.expert_id().is_some()
        );
        Ok(child)
    }

    pub fn get_child(&self, id: ChildId) -> ServiceResult<Child> {
        self.children
            .get_child(id)?
            .ok_or_else(|| not_found(EntityKind::Child, id))
    }

    pub fn list_children(&self) -> ServiceResult<Vec<Child>> {
        Ok(self.children.list_children()?)
    }

    pub fn list_for_expert(&self, expert_id: ExpertId) -> ServiceResult<Vec<Child>> {
        Ok(self.children.list_children_for_expert(expert_id)?)
    }

    pub fn list_for_family(&self, family_id: FamilyId) -> ServiceResult<Vec<Child>> {
        Ok(self.children.list_children_for_family(family_id)?)
    }
}
