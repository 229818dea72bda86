pub mod admin;
pub mod health;
pub mod student;

use axum::Router;

use crate::state::AppState;

/// Build the check-in route tree.
///
/// ```text
/// /admin/company                                   create (POST)
/// /admin/companies                                 list (GET)
/// /admin/student                                   create (POST, admin bearer)
/// /admin/visits                                    list (GET)
///
/// /student/scan                                    record visit (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/admin", admin::router())
        .nest("/student", student::router())
}
