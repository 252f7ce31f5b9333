//! In-Memory Contact Sink
//!
//! Keeps captured contacts in memory. Useful for testing and development,
//! and can be told to reject every write to exercise failure paths.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{ContactRecord, ContactSink, SinkError};

/// In-memory storage for captured contacts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContactSink {
    records: Arc<RwLock<Vec<ContactRecord>>>,
    failure: Option<String>,
}

impl InMemoryContactSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses every record with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            records: Arc::default(),
            failure: Some(message.into()),
        }
    }

    /// All records appended so far, oldest first.
    pub async fn records(&self) -> Vec<ContactRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl ContactSink for InMemoryContactSink {
    async fn append(&self, record: ContactRecord) -> Result<(), SinkError> {
        if let Some(message) = &self.failure {
            return Err(SinkError::unavailable(message.clone()));
        }
        self.records.write().await.push(record);
        Ok(())
    }
}
