//! REST client for the check-in backend.
//!
//! Wraps the four backend endpoints (organization create/list, student
//! create, visit report) using [`reqwest`].

use std::time::Duration;

use visitlog_core::organization::{NewOrganization, Organization};
use visitlog_core::student::NewStudent;
use visitlog_core::visit::{VisitAck, VisitEvent, IDEMPOTENCY_KEY_HEADER};

use crate::session::Credential;

/// HTTP client for one backend deployment.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct BackendApi {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum BackendApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl BackendApi {
    /// Create a client for `base_url`, e.g. `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client with a per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /admin/company`
    pub async fn create_company(&self, input: &NewOrganization) -> Result<(), BackendApiError> {
        let response = self
            .client
            .post(self.url("/admin/company"))
            .json(input)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// `GET /admin/companies`
    pub async fn list_companies(&self) -> Result<Vec<Organization>, BackendApiError> {
        let response = self
            .client
            .get(self.url("/admin/companies"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `POST /admin/student`, authorised with the admin bearer credential.
    pub async fn create_student(
        &self,
        input: &NewStudent,
        credential: &Credential,
    ) -> Result<(), BackendApiError> {
        let response = self
            .client
            .post(self.url("/admin/student"))
            .bearer_auth(credential.expose())
            .json(input)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// `POST /student/scan`
    ///
    /// `idempotency_key` identifies the physical presentation being
    /// reported; the backend records one visit per key.
    pub async fn record_scan(
        &self,
        event: &VisitEvent,
        idempotency_key: &str,
    ) -> Result<VisitAck, BackendApiError> {
        let response = self
            .client
            .post(self.url("/student/scan"))
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
            .json(event)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`BackendApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BackendApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), BackendApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
