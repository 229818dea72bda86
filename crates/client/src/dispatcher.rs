//! Submission dispatcher: reports one scan candidate to the backend.
//!
//! Each call issues exactly one `POST /student/scan`. There is no retry; a
//! failed report needs a fresh presentation of the code.

use visitlog_core::error::CoreError;
use visitlog_core::messages;
use visitlog_core::scan::{ScanCandidate, ScanOutcome};
use visitlog_core::visit::{VisitAck, VisitEvent};

use crate::api::{BackendApi, BackendApiError};

/// Why a visit report failed.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The visit event could not be built (e.g. blank submitter identity).
    #[error("Invalid visit: {0}")]
    Invalid(#[from] CoreError),

    /// Network failure or non-2xx backend response.
    #[error(transparent)]
    Backend(#[from] BackendApiError),

    /// The submission task panicked or was cancelled before finishing.
    #[error("Submission aborted")]
    Aborted,
}

impl SubmissionError {
    /// Flat message shown to the student for any failure.
    pub fn user_message(&self) -> &'static str {
        messages::SUBMISSION_FAILED
    }
}

/// Reports scan candidates as visit events.
#[derive(Debug, Clone)]
pub struct SubmissionDispatcher {
    api: BackendApi,
}

impl SubmissionDispatcher {
    pub fn new(api: BackendApi) -> Self {
        Self { api }
    }

    /// Report `candidate` on behalf of `submitter`.
    ///
    /// The candidate's presentation id is sent as the idempotency key, so
    /// resubmitting the same candidate records a single visit.
    pub async fn submit(
        &self,
        candidate: &ScanCandidate,
        submitter: &str,
    ) -> Result<VisitAck, SubmissionError> {
        let event = VisitEvent::new(submitter, candidate.text.as_str());
        event.validate()?;

        let key = candidate.presentation_id.to_string();
        tracing::debug!(
            company_qr = %event.company_qr,
            student_id = %event.student_id,
            idempotency_key = %key,
            "Submitting visit",
        );

        match self.api.record_scan(&event, &key).await {
            Ok(ack) => {
                tracing::info!(
                    company_qr = %event.company_qr,
                    message = %ack.message,
                    "Visit acknowledged",
                );
                Ok(ack)
            }
            Err(e) => {
                tracing::warn!(
                    company_qr = %event.company_qr,
                    idempotency_key = %key,
                    error = %e,
                    "Visit submission failed",
                );
                Err(e.into())
            }
        }
    }
}

/// Map a dispatch result to the session outcome and the status text shown
/// to the student.
pub fn resolve_outcome(result: &Result<VisitAck, SubmissionError>) -> (ScanOutcome, String) {
    match result {
        Ok(ack) => (ScanOutcome::Succeeded, ack.message.clone()),
        Err(e) => (ScanOutcome::Failed, e.user_message().to_string()),
    }
}
