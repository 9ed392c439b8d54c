//! Service constructors over a borrowed connection.

use rehber_core::repo::{
    assignment_repo::SqliteAssignmentRepository, child_repo::SqliteChildRepository,
    expert_repo::SqliteExpertRepository,
    family_repo::SqliteFamilyRepository, identity_repo::SqliteIdentityRepository,
    report_repo::SqliteReportRepository,
};
use rehber_core::service::{
    account_service::AccountService, assignment_service::AssignmentService,
    child_service::ChildService, claims_service::ClaimsService,
    directory_service::DirectoryService,
    report_service::ReportService,
};
use rusqlite::Connection;

pub type Accounts<'c> = AccountService<
    SqliteIdentityRepository<'c>,
    SqliteExpertRepository<'c>,
    SqliteFamilyRepository<'c>,
>;
pub type Claims<'c> = ClaimsService<SqliteIdentityRepository<'c>>;
pub type Assignments<'c> = AssignmentService<
    SqliteExpertRepository<'c>,
    SqliteFamilyRepository<'c>,
    SqliteAssignmentRepository<'c>,
>;
pub type Children<'c> = ChildService<SqliteChildRepository<'c>>;
pub type Directory<'c> = DirectoryService<SqliteExpertRepository<'c>, SqliteFamilyRepository<'c>>;
pub type Reports<'c> = ReportService<
    SqliteReportRepository<'c>,
    SqliteAssignmentRepository<'c>,
    SqliteExpertRepository<'c>,
>;

pub fn accounts(conn: &Connection, session_ttl_ms: i64) -> Accounts<'_> {
    AccountService::new(
        SqliteIdentityRepository::new(conn),
        SqliteExpertRepository::new(conn),
        SqliteFamilyRepository::new(conn),
    )
    .with_session_ttl_ms(session_ttl_ms)
}

pub fn claims(conn: &Connection) -> Claims<'_> {
    ClaimsService::new(SqliteIdentityRepository::new(conn))
}

pub fn assignments(conn: &Connection) -> Assignments<'_> {
    AssignmentService::new(
        SqliteExpertRepository::new(conn),
        SqliteFamilyRepository::new(conn),
        SqliteAssignmentRepository::new(conn),
    )
}

pub fn children(conn: &Connection) -> Children<'_> {
    ChildService::new(SqliteChildRepository::new(conn))
}

pub fn directory(conn: &Connection) -> Directory<'_> {
    DirectoryService::new(
        SqliteExpertRepository::new(conn),
        SqliteFamilyRepository::new(conn),
    )
}

pub fn reports(conn: &Connection) -> Reports<'_> {
    ReportService::new(
        SqliteReportRepository::new(conn),
        SqliteAssignmentRepository::new(conn),
        SqliteExpertRepository::new(conn),
    )
}
