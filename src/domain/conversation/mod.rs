//! Conversation domain module.
//!
//! Holds the session transcript, the contact capture dialogue, the intent
//! router in front of it and the accumulator for streamed replies.

mod accumulator;
mod capture;
mod errors;
mod intent;
mod message;
mod transcript;

pub use accumulator::TokenStreamAccumulator;
pub use capture::{
    confirmation_message, CapturePhase, CaptureState, CaptureStep, ContactCapture,
    EMAIL_PROMPT, NAME_PROMPT,
};
pub use errors::{CaptureError, StreamInterrupted, TranscriptError};
pub use intent::{IntentRouter, Route, SUBSCRIPTION_KEYWORDS};
pub use message::{Message, Role};
pub use transcript::TranscriptStore;

/// Behavioral instruction seeded as the first message of every transcript.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. When a user wants to subscribe or provide their information, \
ask for their name and email address. Once you have both pieces of information, confirm that you've saved them. \
Be polite and conversational. Only ask for information when the user expresses interest in subscribing or \
providing their details.";
