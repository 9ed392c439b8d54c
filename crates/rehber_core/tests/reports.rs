mod common;

use common::{count, seed_expert, seed_family};
use rehber_core::db::open_db_in_memory;
use rehber_core::media::FsMediaStore;
use rehber_core::model::expert::Expert;
use rehber_core::model::family::Family;
use rehber_core::model::report::{ReportEdit, MAX_IMAGE_BYTES};
use rehber_core::repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
use rehber_core::repo::expert_repo::SqliteExpertRepository;
use rehber_core::repo::report_repo::SqliteReportRepository;
use rehber_core::repo::now_epoch_ms;
use rehber_core::service::report_service::{
    FamilyReview, ImageUpload, NewReport, ReportService,
};
use rehber_core::{EntityKind, ServiceError};
use rusqlite::Connection;

type Reports<'c> = ReportService<
    SqliteReportRepository<'c>,
    SqliteAssignmentRepository<'c>,
    SqliteExpertRepository<'c>,
>;

fn reports(conn: &Connection) -> Reports<'_> {
    ReportService::new(
        SqliteReportRepository::new(conn),
        SqliteAssignmentRepository::new(conn),
        SqliteExpertRepository::new(conn),
    )
}

fn assigned_pair(conn: &Connection) -> (Expert, Family) {
    let expert = seed_expert(conn, "uzman@x.org", "Elif", "Kaya");
    let family = seed_family(conn, "aile@x.org", "Yilmaz");
    SqliteAssignmentRepository::new(conn)
        .upsert_assignment(&expert, &family, now_epoch_ms())
        .unwrap();
    (expert, family)
}

fn new_report(family: &Family, images: Vec<ImageUpload>) -> NewReport {
    NewReport {
        family_id: family.id,
        meeting_date: "2024-03-01".to_string(),
        report_content: "Ev ziyareti yapildi.".to_string(),
        payment: 500.0,
        notes: String::new(),
        images,
    }
}

#[test]
fn created_report_is_listed_for_expert_unapproved() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);
    let service = reports(&conn);

    let report = service
        .create_report(expert.id, new_report(&family, Vec::new()), &media)
        .unwrap();

    let listed = service.list_for_expert(expert.id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, report.id);
    assert!(!listed[0].approved);
    assert!(!listed[0].family_approved);
    assert_eq!(listed[0].family_rating, None);
    assert_eq!(listed[0].family_comment, None);
    assert_eq!(listed[0].expert_email, "uzman@x.org");
    assert_eq!(listed[0].family_name, "Yilmaz");
}

#[test]
fn report_appends_meeting_pointer() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);

    let report = reports(&conn)
        .create_report(expert.id, new_report(&family, Vec::new()), &media)
        .unwrap();

    let assignment = SqliteAssignmentRepository::new(&conn)
        .get_assigned_family(expert.id, family.id)
        .unwrap()
        .unwrap();
    assert_eq!(assignment.meetings.len(), 1);
    assert_eq!(assignment.meetings[0].report_id, report.id);
    assert_eq!(assignment.meetings[0].date, "2024-03-01");
}

#[test]
fn report_for_unassigned_family_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let expert = seed_expert(&conn, "uzman@x.org", "Elif", "Kaya");
    let family = seed_family(&conn, "aile@x.org", "Yilmaz");

    let err = reports(&conn)
        .create_report(expert.id, new_report(&family, Vec::new()), &media)
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(EntityKind::Assignment, _)));
    assert_eq!(count(&conn, "reports"), 0);
}

#[test]
fn images_are_uploaded_before_report_write() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);

    let report = reports(&conn)
        .create_report(
            expert.id,
            new_report(
                &family,
                vec![ImageUpload {
                    file_name: "oturum 1.png".to_string(),
                    bytes: b"png-bytes".to_vec(),
                }],
            ),
            &media,
        )
        .unwrap();

    assert_eq!(report.images.len(), 1);
    let url = &report.images[0];
    assert!(url.starts_with("/media/meeting-images/"));
    assert!(url.ends_with("-oturum_1.png"));
    let relative = url.trim_start_matches("/media/");
    assert_eq!(
        std::fs::read(media_dir.path().join(relative)).unwrap(),
        b"png-bytes"
    );
}

#[test]
fn oversized_or_too_many_images_upload_nothing() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);
    let service = reports(&conn);

    let too_big = vec![ImageUpload {
        file_name: "big.jpg".to_string(),
        bytes: vec![0; MAX_IMAGE_BYTES + 1],
    }];
    let too_many = (0..6)
        .map(|index| ImageUpload {
            file_name: format!("{index}.jpg"),
            bytes: vec![1],
        })
        .collect();

    for images in [too_big, too_many] {
        let err = service
            .create_report(expert.id, new_report(&family, images), &media)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
    assert_eq!(count(&conn, "reports"), 0);
    assert!(!media_dir.path().join("meeting-images").exists());
}

#[test]
fn invalid_meeting_date_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);

    let mut input = new_report(&family, Vec::new());
    input.meeting_date = "01.03.2024".to_string();
    let err = reports(&conn)
        .create_report(expert.id, input, &media)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn all_reports_are_newest_first_and_filter_by_approval() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);
    let service = reports(&conn);

    let older = service
        .create_report(expert.id, new_report(&family, Vec::new()), &media)
        .unwrap();
    let newer = service
        .create_report(expert.id, new_report(&family, Vec::new()), &media)
        .unwrap();
    conn.execute(
        "UPDATE reports SET created_at = 1000 WHERE id = ?1;",
        [older.id.to_string()],
    )
    .unwrap();
    conn.execute(
        "UPDATE reports SET created_at = 2000 WHERE id = ?1;",
        [newer.id.to_string()],
    )
    .unwrap();

    let all = service.list_all(None).unwrap();
    assert_eq!(
        all.iter().map(|report| report.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );

    service
        .admin_update(
            older.id,
            &ReportEdit {
                approved: Some(true),
                ..ReportEdit::default()
            },
        )
        .unwrap();
    let approved = service.list_all(Some(true)).unwrap();
    let pending = service.list_all(Some(false)).unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].id, older.id);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, newer.id);
}

#[test]
fn admin_edit_rejects_out_of_range_rating() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);
    let service = reports(&conn);
    let report = service
        .create_report(expert.id, new_report(&family, Vec::new()), &media)
        .unwrap();

    let err = service
        .admin_update(
            report.id,
            &ReportEdit {
                family_rating: Some(7),
                ..ReportEdit::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let edited = service
        .admin_update(
            report.id,
            &ReportEdit {
                payment: Some(650.0),
                notes: Some("Ek not".to_string()),
                ..ReportEdit::default()
            },
        )
        .unwrap();
    assert_eq!(edited.payment, 650.0);
    assert_eq!(edited.notes, "Ek not");
    assert!(!edited.approved);
}

#[test]
fn family_review_sets_approval_and_rating() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);
    let service = reports(&conn);
    let report = service
        .create_report(expert.id, new_report(&family, Vec::new()), &media)
        .unwrap();

    let reviewed = service
        .family_review(
            family.id,
            report.id,
            &FamilyReview {
                rating: 5,
                comment: Some(" Tesekkurler ".to_string()),
            },
        )
        .unwrap();

    assert!(reviewed.family_approved);
    assert!(!reviewed.approved);
    assert_eq!(reviewed.family_rating, Some(5));
    assert_eq!(reviewed.family_comment.as_deref(), Some("Tesekkurler"));
    assert_eq!(service.list_for_family(family.id).unwrap().len(), 1);
}

#[test]
fn family_review_bounds_and_ownership() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);
    let other = seed_family(&conn, "baska@x.org", "Demir");
    let service = reports(&conn);
    let report = service
        .create_report(expert.id, new_report(&family, Vec::new()), &media)
        .unwrap();

    for rating in [0, 6] {
        let err = service
            .family_review(
                family.id,
                report.id,
                &FamilyReview {
                    rating,
                    comment: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    let err = service
        .family_review(
            other.id,
            report.id,
            &FamilyReview {
                rating: 4,
                comment: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotOwner(_)));
    assert!(!service.get_report(report.id).unwrap().family_approved);
}

#[test]
fn same_name_images_get_distinct_urls() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);

    let images = [b"FIRST".to_vec(), b"SECOND".to_vec()]
        .into_iter()
        .map(|bytes| ImageUpload {
            file_name: "image.jpg".to_string(),
            bytes,
        })
        .collect();
    let report = reports(&conn)
        .create_report(expert.id, new_report(&family, images), &media)
        .unwrap();

    assert_eq!(report.images.len(), 2);
    assert_ne!(report.images[0], report.images[1]);
    let stored: Vec<Vec<u8>> = report
        .images
        .iter()
        .map(|url| std::fs::read(media_dir.path().join(url.trim_start_matches("/media/"))).unwrap())
        .collect();
    assert_eq!(stored, vec![b"FIRST".to_vec(), b"SECOND".to_vec()]);
}

#[test]
fn failed_report_insert_deletes_staged_images() {
    let conn = open_db_in_memory().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let media = FsMediaStore::new(media_dir.path(), "/media");
    let (expert, family) = assigned_pair(&conn);
    let service = reports(&conn);

    let images = vec![ImageUpload {
        file_name: "oturum.png".to_string(),
        bytes: b"png".to_vec(),
    }];
    let staged = service
        .prepare_report(expert.id, new_report(&family, images))
        .unwrap()
        .upload(&media)
        .unwrap();
    let key = staged.image_keys()[0].clone();
    assert!(media_dir.path().join(&key).exists());

    // The assignment disappears between upload and insert.
    conn.execute("DELETE FROM expert_families;", []).unwrap();
    conn.execute("DELETE FROM family_experts;", []).unwrap();

    let err = service.commit_report(staged, &media).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(EntityKind::Assignment, _)));
    assert!(!media_dir.path().join(&key).exists());
    assert_eq!(count(&conn, "reports"), 0);
}
