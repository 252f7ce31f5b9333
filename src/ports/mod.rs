//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the chat core and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - Streaming chat-completions backend
//! - `ContactSink` - Append-only store for captured contacts
//! - `FragmentSink` - Incremental display of a streamed reply

mod ai_provider;
mod contact_sink;
mod fragment_sink;

pub use ai_provider::{
    AIError, AIProvider, ChunkStream, CompletionRequest, FinishReason, ProviderInfo,
    RequestMetadata, StreamChunk, TokenUsage,
};
pub use contact_sink::{ContactRecord, ContactSink, SinkError, RECORD_FIELDS};
pub use fragment_sink::FragmentSink;
