//! Request extractors shared by the handlers.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json<T>` whose rejection renders as an [`AppError`], so malformed bodies
/// get the same `{error, code}` shape as every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
