//! Fragment Sink Adapters.
//!
//! - `WriterSink` - Writes each fragment to any `io::Write` (the terminal)
//! - `BufferSink` - Records fragments for inspection in tests
//! - `NullSink` - Discards everything

use std::io::Write;

use crate::ports::FragmentSink;

/// Writes fragments straight through, flushing after each one.
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> FragmentSink for WriterSink<W> {
    fn on_fragment(&mut self, fragment: &str) {
        let written = self
            .writer
            .write_all(fragment.as_bytes())
            .and_then(|()| self.writer.flush());
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to display fragment");
        }
    }
}

/// Keeps every fragment it receives.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    fragments: Vec<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Everything displayed so far, concatenated.
    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

impl FragmentSink for BufferSink {
    fn on_fragment(&mut self, fragment: &str) {
        self.fragments.push(fragment.to_string());
    }
}

/// Drops every fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FragmentSink for NullSink {
    fn on_fragment(&mut self, _fragment: &str) {}
}
