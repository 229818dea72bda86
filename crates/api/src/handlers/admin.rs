//! Admin handlers: organization registry and student accounts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use visitlog_core::organization::NewOrganization;
use visitlog_core::student::NewStudent;
use visitlog_core::token::Token;

use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::middleware::auth::AdminBearer;
use crate::state::AppState;

/// Raw `POST /admin/company` body; the token is validated before use.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyInput {
    pub company_name: String,
    pub qr_code: String,
}

/// POST /admin/company
///
/// Register an organization under a pre-generated token.
pub async fn create_company(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateCompanyInput>,
) -> AppResult<impl IntoResponse> {
    let token = Token::parse(&input.qr_code)?;
    let new_company = NewOrganization::new(&input.company_name, token)?;

    let company = state.store.create_organization(new_company).await?;

    tracing::info!(
        company_id = company.company_id,
        company_name = %company.company_name,
        "Company created",
    );

    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /admin/companies
///
/// List every organization with its token.
pub async fn list_companies(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.list_organizations().await))
}

/// POST /admin/student
///
/// Create a student account. Requires the admin bearer credential.
pub async fn create_student(
    _admin: AdminBearer,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewStudent>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let student = state.store.create_student(input).await?;

    tracing::info!(
        student_id = student.student_id,
        username = %student.username,
        "Student created",
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Student added",
            "student_id": student.student_id,
        })),
    ))
}

/// GET /admin/visits
///
/// List recorded visits in arrival order.
pub async fn list_visits(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.list_visits().await))
}
