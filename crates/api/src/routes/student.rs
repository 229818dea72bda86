use axum::routing::post;
use axum::Router;

use crate::handlers::student;
use crate::state::AppState;

/// Routes mounted at `/student`.
pub fn router() -> Router<AppState> {
    Router::new().route("/scan", post(student::record_scan))
}
