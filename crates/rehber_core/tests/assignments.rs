mod common;

use common::{count, seed_expert, seed_family};
use rehber_core::db::open_db_in_memory;
use rehber_core::model::assignment::AssignmentStatus;
use rehber_core::model::report::MeetingRef;
use rehber_core::repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
use rehber_core::repo::expert_repo::SqliteExpertRepository;
use rehber_core::repo::family_repo::SqliteFamilyRepository;
use rehber_core::repo::EntityKind;
use rehber_core::service::assignment_service::AssignmentService;
use rehber_core::ServiceError;
use rusqlite::Connection;
use uuid::Uuid;

fn service(
    conn: &Connection,
) -> AssignmentService<
    SqliteExpertRepository<'_>,
    SqliteFamilyRepository<'_>,
    SqliteAssignmentRepository<'_>,
> {
    AssignmentService::new(
        SqliteExpertRepository::new(conn),
        SqliteFamilyRepository::new(conn),
        SqliteAssignmentRepository::new(conn),
    )
}

#[test]
fn assigning_twice_leaves_one_mirrored_pair() {
    let conn = open_db_in_memory().unwrap();
    let expert = seed_expert(&conn, "uzman@x.org", "Elif", "Kaya");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");
    let service = service(&conn);

    let first = service.assign_families("uzman@x.org", "aile@x.org").unwrap();
    let second = service.assign_families("uzman@x.org", "aile@x.org").unwrap();

    assert_eq!(first.assigned, vec![family.id]);
    assert_eq!(second.assigned, vec![family.id]);
    assert_eq!(count(&conn, "expert_families"), 1);
    assert_eq!(count(&conn, "family_experts"), 1);

    let repo = SqliteAssignmentRepository::new(&conn);
    let expert_side = repo
        .get_assigned_family(expert.id, family.id)
        .unwrap()
        .unwrap();
    let family_side = repo
        .get_assigned_expert(family.id, expert.id)
        .unwrap()
        .unwrap();
    assert_eq!(expert_side.status, AssignmentStatus::Active);
    assert_eq!(expert_side.family.family_name, "Yilmaz");
    assert_eq!(expert_side.family.city, "Ankara");
    assert_eq!(family_side.status, AssignmentStatus::Active);
    assert_eq!(family_side.expert.first_name, "Elif");
}

#[test]
fn unknown_expert_is_not_found_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    seed_family(&conn, "aile@x.org", "Yilmaz");

    let err = service(&conn)
        .assign_families("yok@x.org", "aile@x.org")
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(EntityKind::Expert, _)));
    assert_eq!(count(&conn, "expert_families"), 0);
    assert_eq!(count(&conn, "family_experts"), 0);
}

#[test]
fn unmatched_family_email_is_skipped() {
    let conn = open_db_in_memory().unwrap();
    seed_expert(&conn, "uzman@x.org", "Elif", "Kaya");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");

    let outcome = service(&conn)
        .assign_families(" uzman@x.org ", "aile@x.org, kayip@x.org,  ")
        .unwrap();

    assert_eq!(outcome.assigned, vec![family.id]);
    assert_eq!(outcome.skipped, vec!["kayip@x.org".to_string()]);
    assert_eq!(count(&conn, "expert_families"), 1);
    assert_eq!(count(&conn, "family_experts"), 1);
}

#[test]
fn email_lookup_ignores_case() {
    let conn = open_db_in_memory().unwrap();
    seed_expert(&conn, "uzman@x.org", "Elif", "Kaya");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");

    let outcome = service(&conn)
        .assign_families("UZMAN@x.org", "Aile@X.org")
        .unwrap();
    assert_eq!(outcome.assigned, vec![family.id]);
}

#[test]
fn reassignment_preserves_meetings() {
    let conn = open_db_in_memory().unwrap();
    let expert = seed_expert(&conn, "uzman@x.org", "Elif", "Kaya");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");
    let service = service(&conn);
    service.assign_families("uzman@x.org", "aile@x.org").unwrap();

    let meeting = MeetingRef {
        report_id: Uuid::new_v4(),
        date: "2024-03-01".to_string(),
    };
    conn.execute(
        "UPDATE expert_families SET meetings = ?1;",
        [serde_json::to_string(&vec![meeting.clone()]).unwrap()],
    )
    .unwrap();

    service.assign_families("uzman@x.org", "aile@x.org").unwrap();
    let stored = SqliteAssignmentRepository::new(&conn)
        .get_assigned_family(expert.id, family.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.meetings, vec![meeting]);
}

#[test]
fn listings_follow_each_side() {
    let conn = open_db_in_memory().unwrap();
    let expert = seed_expert(&conn, "uzman@x.org", "Elif", "Kaya");
    let first = seed_family(&conn, "a@x.org", "Aydin");
    let second = seed_family(&conn, "b@x.org", "Bulut");
    let service = service(&conn);
    service
        .assign_families("uzman@x.org", "a@x.org,b@x.org")
        .unwrap();

    let families = service.families_for_expert(expert.id).unwrap();
    assert_eq!(families.len(), 2);
    let experts = service.experts_for_family(second.id).unwrap();
    assert_eq!(experts.len(), 1);
    assert_eq!(experts[0].expert_id, expert.id);
    assert!(service.experts_for_family(first.id).unwrap()[0].expert.email == "uzman@x.org");
}
