//! # Submission Status
//!
//! The single observable status object consumed by the presentation layer.
//!
//! ```text
//! idle -> encrypting -> signing -> submitting -> waiting -> success
//!   \          \           \            \            \
//!    +----------+-----------+------------+------------+--> error
//! success | error --(display delay or dismiss)--> idle
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::BetClientError;

/// Stage of a submission attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Fetching the MXE key and encrypting the prediction.
    Encrypting,
    /// Deriving addresses and building the instruction.
    Signing,
    /// Transaction sent, awaiting inclusion.
    Submitting,
    /// Transaction included, awaiting MXE finalization.
    Waiting,
    /// Computation finalized.
    Success,
    /// Attempt failed.
    Error,
}

impl SubmissionStatus {
    /// Whether the attempt is over.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Any state may fall to `error` or be reset to `idle`.
    pub const fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        match (self, next) {
            (_, Self::Idle) => true,
            (Self::Success, Self::Error) => false,
            (_, Self::Error) => true,
            (Self::Idle, Self::Encrypting)
            | (Self::Encrypting, Self::Signing)
            | (Self::Signing, Self::Submitting)
            | (Self::Submitting, Self::Waiting)
            | (Self::Waiting, Self::Success) => true,
            _ => false,
        }
    }

    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Encrypting => "encrypting",
            Self::Signing => "signing",
            Self::Submitting => "submitting",
            Self::Waiting => "waiting",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// `{status, message, signature?, error?}` as seen by the UI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Current stage.
    pub status: SubmissionStatus,
    /// Human-readable progress message.
    pub message: String,
    /// Transaction or finalization signature, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Underlying error text for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Attempt this report belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<Uuid>,
}

impl StatusReport {
    /// Idle report with an empty message.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Progress report for a non-terminal stage.
    pub fn progress(attempt_id: Uuid, status: SubmissionStatus) -> Self {
        let message = match status {
            SubmissionStatus::Encrypting => "Encrypting prediction...",
            SubmissionStatus::Signing => "Preparing transaction...",
            SubmissionStatus::Submitting => "Submitting transaction...",
            SubmissionStatus::Waiting => "Waiting for computation finalization...",
            SubmissionStatus::Success => "Bet placed successfully!",
            SubmissionStatus::Idle | SubmissionStatus::Error => "",
        };
        Self {
            status,
            message: message.to_string(),
            signature: None,
            error: None,
            attempt_id: Some(attempt_id),
        }
    }

    /// Attach a signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Error report carrying the headline and the raw error.
    pub fn failed(attempt_id: Option<Uuid>, error: &BetClientError) -> Self {
        Self {
            status: SubmissionStatus::Error,
            message: error.headline().to_string(),
            signature: None,
            error: Some(error.to_string()),
            attempt_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use SubmissionStatus::*;
        let path = [Idle, Encrypting, Signing, Submitting, Waiting, Success, Idle];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_skipping_stages_rejected() {
        use SubmissionStatus::*;
        assert!(!Idle.can_transition_to(Submitting));
        assert!(!Encrypting.can_transition_to(Waiting));
        assert!(!Success.can_transition_to(Error));
        assert!(!Error.can_transition_to(Success));
    }

    #[test]
    fn test_any_stage_can_fail() {
        use SubmissionStatus::*;
        for s in [Idle, Encrypting, Signing, Submitting, Waiting] {
            assert!(s.can_transition_to(Error));
        }
    }

    #[test]
    fn test_failed_report_carries_error() {
        let report = StatusReport::failed(None, &BetClientError::WalletNotConnected);
        assert_eq!(report.status, SubmissionStatus::Error);
        assert_eq!(report.message, "Wallet not connected");
        assert_eq!(report.error.as_deref(), Some("Wallet not connected"));
    }

    #[test]
    fn test_report_serializes_without_empty_fields() {
        let json = serde_json::to_string(&StatusReport::idle()).unwrap();
        assert_eq!(json, r#"{"status":"idle","message":""}"#);
    }
}
