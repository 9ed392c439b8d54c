//! HTTP route table.

pub mod accounts;
pub mod assignments;
pub mod children;
pub mod directory;
pub mod profiles;
pub mod reports;
pub mod roles;
pub mod session;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/session/login", post(session::login))
        .route("/session/logout", post(session::logout))
        .route("/session/me", get(session::me))
        .route("/create-expert", post(accounts::create_expert))
        .route("/create-family", post(accounts::create_family))
        .route("/set-user-role", post(roles::set_user_role))
        .route("/user-role", post(roles::user_role))
        .route("/check-role", post(roles::check_role))
        .route("/assign-families", post(assignments::assign_families))
        .route("/expert-families", get(assignments::expert_families))
        .route("/family-experts", get(assignments::family_experts))
        .route("/experts", get(directory::list_experts))
        .route("/families", get(directory::list_families))
        .route(
            "/children",
            get(children::list_children).post(children::create_child),
        )
        .route("/create-child", post(children::create_child))
        .route("/expert-children", get(children::expert_children))
        .route("/update-child", post(children::update_child))
        .route("/profile", get(profiles::profile))
        .route("/update-expert-profile", post(profiles::update_expert_profile))
        .route("/update-family-profile", post(profiles::update_family_profile))
        .route(
            "/reports",
            get(reports::list_reports).post(reports::create_report),
        )
        .route("/reports/:id", put(reports::update_report))
        .route("/reports/:id/family-review", post(reports::family_review))
        .route("/all-reports", get(reports::all_reports))
}
