//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Contract violations
    InvalidRole,
    UnknownModel,
    IllegalStateTransition,

    // Runtime failures
    StreamInterrupted,
    AIProviderError,
    PersistenceFailed,

    InternalError,
}

impl ErrorCode {
    /// Returns true if the code signals an internal inconsistency rather than
    /// an expected operating condition.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidRole | ErrorCode::UnknownModel | ErrorCode::IllegalStateTransition
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidRole => "INVALID_ROLE",
            ErrorCode::UnknownModel => "UNKNOWN_MODEL",
            ErrorCode::IllegalStateTransition => "ILLEGAL_STATE_TRANSITION",
            ErrorCode::StreamInterrupted => "STREAM_INTERRUPTED",
            ErrorCode::AIProviderError => "AI_PROVIDER_ERROR",
            ErrorCode::PersistenceFailed => "PERSISTENCE_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}
