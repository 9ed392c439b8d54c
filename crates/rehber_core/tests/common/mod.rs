#![allow(dead_code)]

use rehber_core::model::expert::Expert;
use rehber_core::model::family::Family;
use rehber_core::model::identity::Role;
use rehber_core::repo::expert_repo::{ExpertRepository, SqliteExpertRepository};
use rehber_core::repo::family_repo::{FamilyRepository, SqliteFamilyRepository};
use rehber_core::repo::identity_repo::{IdentityRepository, SqliteIdentityRepository};
use rusqlite::Connection;

/// Inserts an expert account without hashing a password.
pub fn seed_expert(conn: &Connection, email: &str, first: &str, last: &str) -> Expert {
    let uid = SqliteIdentityRepository::new(conn)
        .create_user(email, "unused-hash", Some(Role::Expert))
        .unwrap();
    let expert = Expert::new(uid, email, first, last);
    let repo = SqliteExpertRepository::new(conn);
    repo.create_expert(&expert).unwrap();
    repo.get_expert(uid).unwrap().unwrap()
}

/// Inserts a family account without hashing a password.
pub fn seed_family(conn: &Connection, email: &str, family_name: &str) -> Family {
    let uid = SqliteIdentityRepository::new(conn)
        .create_user(email, "unused-hash", Some(Role::Family))
        .unwrap();
    let mut family = Family::new(uid, email, family_name);
    family.address.city = "Ankara".to_string();
    let repo = SqliteFamilyRepository::new(conn);
    repo.create_family(&family).unwrap();
    repo.get_family(uid).unwrap().unwrap()
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
