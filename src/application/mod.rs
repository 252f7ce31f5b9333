//! Application layer - Session orchestration.
//!
//! Coordinates the conversation domain with the AI provider and contact
//! sink ports, one `ChatSession` per visitor.

mod chat_session;

pub use chat_session::{ChatSession, SessionError, TurnOutcome};
