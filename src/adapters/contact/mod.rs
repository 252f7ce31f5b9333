//! Contact Sink Adapters.
//!
//! - `CsvContactSink` - Append-only CSV file (production)
//! - `InMemoryContactSink` - In-memory store for tests

mod csv_sink;
mod in_memory;

pub use csv_sink::{format_row, CsvContactSink, DEFAULT_CSV_PATH};
pub use in_memory::InMemoryContactSink;
