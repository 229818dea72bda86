//! Visit events reported by the student client.

use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::messages;
use crate::types::Timestamp;

/// Header carrying the per-presentation idempotency key on `POST /student/scan`.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Body of `POST /student/scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitEvent {
    /// Identity of the submitting student.
    pub student_id: String,
    /// Decoded token text, sent exactly as scanned.
    pub company_qr: String,
    /// Submission instant, millisecond precision.
    pub scan_time: Timestamp,
}

impl VisitEvent {
    /// Build an event stamped with the current instant.
    pub fn new(student_id: impl Into<String>, company_qr: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            company_qr: company_qr.into(),
            scan_time: Utc::now().trunc_subsecs(3),
        }
    }

    /// Reject events missing either identity field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.student_id.trim().is_empty() {
            return Err(CoreError::Validation("studentId must not be empty".into()));
        }
        if self.company_qr.is_empty() {
            return Err(CoreError::Validation("companyQr must not be empty".into()));
        }
        Ok(())
    }
}

/// Backend acknowledgment of a recorded visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitAck {
    /// Human-readable outcome, surfaced verbatim to the student.
    #[serde(default = "default_ack_message")]
    pub message: String,
}

fn default_ack_message() -> String {
    messages::VISIT_RECORDED.to_string()
}
