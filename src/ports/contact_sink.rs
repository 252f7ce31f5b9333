//! Contact Sink Port - Append-only store for captured visitor details.
//!
//! The capture dialogue hands every completed (name, email) pair to this
//! port exactly once. Implementations must tolerate concurrent appends from
//! independent sessions; each record is written atomically, order across
//! sessions is unspecified. There are no update or delete operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Column order of a persisted record.
pub const RECORD_FIELDS: [&str; 3] = ["timestamp", "name", "email"];

/// One captured contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// When the pair was completed.
    pub timestamp: Timestamp,
    /// Name exactly as typed by the visitor.
    pub name: String,
    /// Email exactly as typed by the visitor.
    pub email: String,
}

impl ContactRecord {
    /// Creates a record stamped with the current time.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::at(Timestamp::now(), name, email)
    }

    /// Creates a record with an explicit timestamp.
    pub fn at(timestamp: Timestamp, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            timestamp,
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Port for persisting captured contacts.
#[async_trait]
pub trait ContactSink: Send + Sync {
    /// Appends one record.
    async fn append(&self, record: ContactRecord) -> Result<(), SinkError>;
}

/// Persistence sink errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SinkError {
    /// The underlying store could not be written.
    #[error("io error: {0}")]
    Io(String),

    /// The store refused the record.
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

impl SinkError {
    pub fn io(message: impl Into<String>) -> Self {
        SinkError::Io(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        SinkError::Unavailable(message.into())
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err.to_string())
    }
}
