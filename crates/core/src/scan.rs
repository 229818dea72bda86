//! Scan-session state machine.
//!
//! A [`ScanSession`] is fed every decode attempt the camera produces (one per
//! poll) and emits at most one [`ScanCandidate`] per physical presentation of
//! a code. A code held in front of the camera is re-decoded on every frame;
//! those repeats must never turn into extra submissions.
//!
//! ```text
//! Idle --text--> Detecting --> Dispatching --complete--> Outcome --acknowledge--> Idle
//!   ^                                                       |
//!   +------------------- decode failure -------------------+
//! ```

use std::fmt;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Decode attempts
// ---------------------------------------------------------------------------

/// The result of one decode poll, resolved once at the camera boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeAttempt {
    /// A code was in view and decoded to this text.
    DecodedText(String),
    /// No code was in view.
    Empty,
}

/// Shapes the camera collaborator is known to emit.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPayload {
    Text(String),
    Object { text: Option<String> },
}

impl DecodeAttempt {
    /// Classify plain decoded text. Empty text counts as no code in view.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::Empty
        } else {
            Self::DecodedText(text)
        }
    }

    /// Classify a raw collaborator payload: a bare string, an object
    /// carrying a `text` field, or null.
    pub fn from_payload(payload: serde_json::Value) -> Self {
        match serde_json::from_value::<RawPayload>(payload) {
            Ok(RawPayload::Text(text)) => Self::from_text(text),
            Ok(RawPayload::Object { text: Some(text) }) => Self::from_text(text),
            Ok(RawPayload::Object { text: None }) | Err(_) => Self::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Terminal result of one scan attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Succeeded,
    Failed,
}

/// Current state of a [`ScanSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    /// A frame produced text. Never observed from outside: a detection
    /// becomes `Dispatching` within the same [`ScanSession::observe_at`] call.
    Detecting,
    Dispatching,
    Outcome(ScanOutcome),
}

impl ScanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Detecting => "detecting",
            Self::Dispatching => "dispatching",
            Self::Outcome(ScanOutcome::Succeeded) => "succeeded",
            Self::Outcome(ScanOutcome::Failed) => "failed",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded code accepted for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCandidate {
    /// Raw decoded text.
    pub text: String,
    /// When the session accepted the decode.
    pub detected_at: Timestamp,
    /// Identifies the physical presentation; sent as the idempotency key so a
    /// resubmitted candidate is recorded once.
    pub presentation_id: Uuid,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Gatekeeper between the frame feed and the submission dispatcher.
#[derive(Debug)]
pub struct ScanSession {
    state: ScanState,
    /// Text of the last dispatched code while it is still in view. Cleared by
    /// the first empty decode.
    in_view: Option<String>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            in_view: None,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ScanState::Idle
    }

    /// Feed one decode attempt, stamping any candidate with the current time.
    pub fn observe(&mut self, attempt: DecodeAttempt) -> Option<ScanCandidate> {
        self.observe_at(attempt, Utc::now())
    }

    /// Feed one decode attempt.
    ///
    /// The duplicate gate keys on the in-view text: the code of the last
    /// dispatch stays "in view" until an `Empty` frame arrives, and while it
    /// is in view that same text never dispatches again. Outside `Idle` every
    /// text frame is ignored without touching the in-view memory, so a
    /// misread during a dispatch cannot re-arm the held code.
    ///
    /// Returns a candidate only when the session is `Idle` and the text is
    /// not the in-view code. The session is then `Dispatching` until
    /// [`complete`] is called.
    ///
    /// [`complete`]: ScanSession::complete
    pub fn observe_at(&mut self, attempt: DecodeAttempt, now: Timestamp) -> Option<ScanCandidate> {
        let text = match attempt {
            DecodeAttempt::Empty => {
                self.in_view = None;
                return None;
            }
            DecodeAttempt::DecodedText(text) => text,
        };

        if self.state != ScanState::Idle {
            return None;
        }
        if self.in_view.as_deref() == Some(text.as_str()) {
            return None;
        }

        // Detecting and Dispatching happen in the same step here.
        self.in_view = Some(text.clone());
        self.state = ScanState::Dispatching;

        Some(ScanCandidate {
            text,
            detected_at: now,
            presentation_id: Uuid::new_v4(),
        })
    }

    /// Record a capability-level decode failure.
    ///
    /// Moves an idle session straight to `Outcome(Failed)` and returns
    /// `true`; in any other state the failure is ignored.
    pub fn decode_failed(&mut self) -> bool {
        if self.state != ScanState::Idle {
            return false;
        }
        self.state = ScanState::Outcome(ScanOutcome::Failed);
        true
    }

    /// Record the dispatcher's result for the in-flight candidate.
    pub fn complete(&mut self, outcome: ScanOutcome) -> Result<(), CoreError> {
        if self.state != ScanState::Dispatching {
            return Err(CoreError::Validation(format!(
                "Cannot complete a dispatch while {}",
                self.state
            )));
        }
        self.state = ScanState::Outcome(outcome);
        Ok(())
    }

    /// Return to `Idle` once the outcome has been rendered to the user.
    pub fn acknowledge_outcome(&mut self) -> Result<ScanOutcome, CoreError> {
        match self.state {
            ScanState::Outcome(outcome) => {
                self.state = ScanState::Idle;
                Ok(outcome)
            }
            other => Err(CoreError::Validation(format!(
                "No outcome to acknowledge while {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
