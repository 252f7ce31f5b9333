//! Session-scoped transcript of role-tagged messages.
//!
//! # Invariants
//!
//! - After `reset` the first (and only) message is the system instruction
//! - Messages are only ever appended; nothing is edited or reordered
//! - The whole store is discarded on reset

use super::errors::TranscriptError;
use super::message::{Message, Role};

/// Ordered list of messages belonging to one chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptStore {
    messages: Vec<Message>,
}

impl TranscriptStore {
    /// Creates an empty store. Callers normally use [`TranscriptStore::seeded`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding only the given system instruction.
    pub fn seeded(system_prompt: impl Into<String>) -> Self {
        let mut store = Self::new();
        store.reset(system_prompt);
        store
    }

    /// Discards all history and re-seeds with the system instruction.
    pub fn reset(&mut self, system_prompt: impl Into<String>) {
        self.messages.clear();
        self.messages.push(Message::system(system_prompt));
    }

    /// Appends a message to the end of the transcript.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    /// Appends a message whose role arrives as a string tag.
    ///
    /// # Errors
    ///
    /// - `InvalidRole` if the tag is not one of system/user/assistant; the
    ///   transcript is left untouched.
    pub fn append_tagged(
        &mut self,
        tag: &str,
        content: impl Into<String>,
    ) -> Result<(), TranscriptError> {
        let role: Role = tag.parse()?;
        self.append(role, content);
        Ok(())
    }

    /// Returns every stored message in storage order, as sent to the
    /// completion backend.
    pub fn snapshot_for_backend(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Returns the messages a visitor sees when the transcript is redrawn.
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role().is_user_visible())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn first(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
