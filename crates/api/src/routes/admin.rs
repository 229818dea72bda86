use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/company", post(admin::create_company))
        .route("/companies", get(admin::list_companies))
        .route("/student", post(admin::create_student))
        .route("/visits", get(admin::list_visits))
}
