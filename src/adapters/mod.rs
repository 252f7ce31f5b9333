//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Completion backends (Groq, mock)
//! - `contact` - Contact persistence (CSV file, in-memory)
//! - `display` - Fragment sinks for incremental rendering

pub mod ai;
pub mod contact;
pub mod display;

pub use ai::{GroqConfig, GroqProvider, MockAIProvider};
pub use contact::{CsvContactSink, InMemoryContactSink};
pub use display::{BufferSink, NullSink, WriterSink};
