mod common;

use common::{seed_expert, seed_family};
use rehber_core::db::open_db_in_memory;
use rehber_core::model::child::{ChildFields, SchoolType};
use rehber_core::repo::child_repo::{ChildUpdate, SqliteChildRepository};
use rehber_core::repo::expert_repo::{ExpertRepository, SqliteExpertRepository};
use rehber_core::repo::family_repo::{FamilyRepository, SqliteFamilyRepository};
use rehber_core::service::child_service::{ChildService, NewChild};
use rehber_core::{EntityKind, ServiceError};
use uuid::Uuid;

fn fields(name: &str) -> ChildFields {
    ChildFields {
        name: name.to_string(),
        school_type: SchoolType::Private,
        session_fee: Some(750.0),
        ..ChildFields::default()
    }
}

#[test]
fn create_child_links_family_and_expert() {
    let conn = open_db_in_memory().unwrap();
    let expert = seed_expert(&conn, "uzman@x.org", "Elif", "Kaya");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");
    let service = ChildService::new(SqliteChildRepository::new(&conn));

    let child = service
        .create_child(NewChild {
            family_id: family.id,
            expert_id: Some(expert.id),
            fields: fields("Ali"),
        })
        .unwrap();

    assert_eq!(child.expert_ids, vec![expert.id]);
    assert_eq!(child.fields.session_fee, Some(750.0));
    let family = SqliteFamilyRepository::new(&conn)
        .get_family(family.id)
        .unwrap()
        .unwrap();
    let expert = SqliteExpertRepository::new(&conn)
        .get_expert(expert.id)
        .unwrap()
        .unwrap();
    assert_eq!(family.child_ids, vec![child.id]);
    assert_eq!(expert.child_ids, vec![child.id]);
    assert_eq!(service.list_for_expert(expert.id).unwrap().len(), 1);
    assert_eq!(service.list_for_family(family.id).unwrap().len(), 1);
}

#[test]
fn create_child_for_unknown_family_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = ChildService::new(SqliteChildRepository::new(&conn));

    let err = service
        .create_child(NewChild {
            family_id: Uuid::new_v4(),
            expert_id: None,
            fields: fields("Ali"),
        })
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(EntityKind::Family, _)));
    assert!(service.list_children().unwrap().is_empty());
}

#[test]
fn create_child_for_unknown_expert_rolls_back() {
    let conn = open_db_in_memory().unwrap();
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");
    let service = ChildService::new(SqliteChildRepository::new(&conn));

    let err = service
        .create_child(NewChild {
            family_id: family.id,
            expert_id: Some(Uuid::new_v4()),
            fields: fields("Ali"),
        })
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(EntityKind::Expert, _)));
    assert!(service.list_children().unwrap().is_empty());
    let family = SqliteFamilyRepository::new(&conn)
        .get_family(family.id)
        .unwrap()
        .unwrap();
    assert!(family.child_ids.is_empty());
}

#[test]
fn moving_child_from_a_to_b_updates_both_experts() {
    let conn = open_db_in_memory().unwrap();
    let expert_a = seed_expert(&conn, "a@x.org", "Ayse", "Ak");
    let expert_b = seed_expert(&conn, "b@x.org", "Burak", "Bal");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");
    let service = ChildService::new(SqliteChildRepository::new(&conn));
    let child = service
        .create_child(NewChild {
            family_id: family.id,
            expert_id: Some(expert_a.id),
            fields: fields("Ali"),
        })
        .unwrap();

    let mut new_fields = fields("Ali Can");
    new_fields.special_education = true;
    let updated = service
        .update_child(&ChildUpdate {
            child_id: child.id,
            fields: new_fields,
            expert_id: Some(expert_b.id),
            old_expert_id: Some(expert_a.id),
        })
        .unwrap();

    assert_eq!(updated.expert_ids, vec![expert_b.id]);
    assert_eq!(updated.fields.name, "Ali Can");
    assert!(updated.fields.special_education);

    let experts = SqliteExpertRepository::new(&conn);
    assert!(experts
        .get_expert(expert_a.id)
        .unwrap()
        .unwrap()
        .child_ids
        .is_empty());
    assert_eq!(
        experts.get_expert(expert_b.id).unwrap().unwrap().child_ids,
        vec![child.id]
    );
}

#[test]
fn stale_old_expert_hint_still_unlinks_stored_expert() {
    let conn = open_db_in_memory().unwrap();
    let expert_a = seed_expert(&conn, "a@x.org", "Ayse", "Ak");
    let expert_b = seed_expert(&conn, "b@x.org", "Burak", "Bal");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");
    let service = ChildService::new(SqliteChildRepository::new(&conn));
    let child = service
        .create_child(NewChild {
            family_id: family.id,
            expert_id: Some(expert_a.id),
            fields: fields("Ali"),
        })
        .unwrap();

    service
        .update_child(&ChildUpdate {
            child_id: child.id,
            fields: fields("Ali"),
            expert_id: Some(expert_b.id),
            old_expert_id: None,
        })
        .unwrap();

    let experts = SqliteExpertRepository::new(&conn);
    assert!(experts
        .get_expert(expert_a.id)
        .unwrap()
        .unwrap()
        .child_ids
        .is_empty());
}

#[test]
fn unlinking_child_clears_expert_side() {
    let conn = open_db_in_memory().unwrap();
    let expert = seed_expert(&conn, "a@x.org", "Ayse", "Ak");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");
    let service = ChildService::new(SqliteChildRepository::new(&conn));
    let child = service
        .create_child(NewChild {
            family_id: family.id,
            expert_id: Some(expert.id),
            fields: fields("Ali"),
        })
        .unwrap();

    let updated = service
        .update_child(&ChildUpdate {
            child_id: child.id,
            fields: fields("Ali"),
            expert_id: None,
            old_expert_id: Some(expert.id),
        })
        .unwrap();

    assert!(updated.expert_ids.is_empty());
    assert!(service.list_for_expert(expert.id).unwrap().is_empty());
}

#[test]
fn update_to_unknown_expert_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let expert = seed_expert(&conn, "a@x.org", "Ayse", "Ak");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");
    let service = ChildService::new(SqliteChildRepository::new(&conn));
    let child = service
        .create_child(NewChild {
            family_id: family.id,
            expert_id: Some(expert.id),
            fields: fields("Ali"),
        })
        .unwrap();

    let err = service
        .update_child(&ChildUpdate {
            child_id: child.id,
            fields: fields("Degisti"),
            expert_id: Some(Uuid::new_v4()),
            old_expert_id: Some(expert.id),
        })
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(EntityKind::Expert, _)));
    let stored = service.get_child(child.id).unwrap();
    assert_eq!(stored.fields.name, "Ali");
    assert_eq!(stored.expert_ids, vec![expert.id]);
}
