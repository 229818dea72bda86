//! Student handlers: visit check-in.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use visitlog_core::visit::{VisitEvent, IDEMPOTENCY_KEY_HEADER};

use crate::error::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::state::AppState;

/// POST /student/scan
///
/// Record a visit for a scanned organization token. A repeated
/// `Idempotency-Key` replays the first acknowledgment.
pub async fn record_scan(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(event): JsonBody<VisitEvent>,
) -> AppResult<impl IntoResponse> {
    event.validate()?;

    let idempotency_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AppError::BadRequest("Idempotency-Key must be ASCII".into()))?
                .to_string(),
        ),
        None => None,
    };

    let recorded = state
        .store
        .record_visit(event.clone(), idempotency_key.as_deref())
        .await?;

    if recorded.replayed {
        tracing::info!(
            visit_id = recorded.visit_id,
            idempotency_key = idempotency_key.as_deref().unwrap_or_default(),
            "Replayed visit acknowledgment",
        );
    } else {
        tracing::info!(
            visit_id = recorded.visit_id,
            student_id = %event.student_id,
            company_qr = %event.company_qr,
            "Visit recorded",
        );
    }

    Ok(Json(recorded.ack))
}
