//! Conversation-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::SinkError;

/// Errors raised while mutating the transcript.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TranscriptError {
    /// A message was tagged with something other than system/user/assistant.
    #[error("invalid role tag '{tag}': expected system, user or assistant")]
    InvalidRole { tag: String },
}

impl TranscriptError {
    pub fn invalid_role(tag: impl Into<String>) -> Self {
        TranscriptError::InvalidRole { tag: tag.into() }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::InvalidRole
    }
}

/// Errors raised by the contact capture dialogue.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The dialogue was driven in a way its current phase does not allow.
    #[error("illegal capture transition: {0}")]
    IllegalStateTransition(DomainError),

    /// The completed pair could not be handed to the persistence sink.
    #[error("failed to persist contact details: {0}")]
    Persistence(#[from] SinkError),
}

impl CaptureError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CaptureError::IllegalStateTransition(_) => ErrorCode::IllegalStateTransition,
            CaptureError::Persistence(_) => ErrorCode::PersistenceFailed,
        }
    }
}

impl From<DomainError> for CaptureError {
    fn from(err: DomainError) -> Self {
        CaptureError::IllegalStateTransition(err)
    }
}

/// The backend fragment stream failed before it was exhausted.
///
/// Carries whatever text had been accumulated up to the failure so callers
/// can report it; the text is never committed to the transcript.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("stream interrupted after {fragments} fragment(s): {reason}")]
pub struct StreamInterrupted {
    /// Text accumulated before the failure.
    pub partial: String,
    /// Number of non-empty fragments forwarded before the failure.
    pub fragments: usize,
    /// Rendered cause of the failure.
    pub reason: String,
}

impl StreamInterrupted {
    pub fn new(partial: impl Into<String>, fragments: usize, reason: impl Into<String>) -> Self {
        Self {
            partial: partial.into(),
            fragments,
            reason: reason.into(),
        }
    }

    /// Interruption before any fragment arrived (e.g. the request itself failed).
    pub fn before_first_fragment(reason: impl Into<String>) -> Self {
        Self::new(String::new(), 0, reason)
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::StreamInterrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_role_displays_tag() {
        let err = TranscriptError::invalid_role("tool");
        assert_eq!(
            err.to_string(),
            "invalid role tag 'tool': expected system, user or assistant"
        );
        assert_eq!(err.code(), ErrorCode::InvalidRole);
    }

    #[test]
    fn capture_error_codes() {
        let illegal = CaptureError::from(DomainError::new(
            ErrorCode::IllegalStateTransition,
            "Cannot transition from Idle to AwaitingEmail",
        ));
        assert_eq!(illegal.code(), ErrorCode::IllegalStateTransition);

        let persistence = CaptureError::from(SinkError::io("disk full"));
        assert_eq!(persistence.code(), ErrorCode::PersistenceFailed);
    }

    #[test]
    fn stream_interrupted_keeps_partial_text() {
        let err = StreamInterrupted::new("Hel", 1, "network error: reset");
        assert_eq!(err.partial, "Hel");
        assert_eq!(
            err.to_string(),
            "stream interrupted after 1 fragment(s): network error: reset"
        );
    }

    #[test]
    fn before_first_fragment_has_no_partial_text() {
        let err = StreamInterrupted::before_first_fragment("authentication failed");
        assert!(err.partial.is_empty());
        assert_eq!(err.fragments, 0);
        assert_eq!(err.code(), ErrorCode::StreamInterrupted);
    }
}
