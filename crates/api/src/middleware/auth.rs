//! Bearer-credential extractor for admin-only handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use visitlog_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Marker extractor: the request carried the configured admin bearer
/// credential in its `Authorization` header.
///
/// ```ignore
/// async fn handler(_admin: AdminBearer) -> AppResult<Json<()>> { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AdminBearer;

impl FromRequestParts<AppState> for AdminBearer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.config.admin_token.as_deref().ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Admin credential is not configured".into(),
            ))
        })?;

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        if token != expected {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid admin credential".into(),
            )));
        }

        Ok(AdminBearer)
    }
}
