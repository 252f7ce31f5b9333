//! Reduction of a streamed reply into one string.
//!
//! The accumulator pulls fragments in order, forwards each non-empty one to
//! the display sink and concatenates them. A mid-stream failure becomes
//! [`StreamInterrupted`] carrying the text gathered so far.

use futures::{pin_mut, Stream, StreamExt};
use std::fmt::Display;

use crate::ports::FragmentSink;

use super::errors::StreamInterrupted;

/// Pulls a fragment stream to completion.
#[derive(Debug, Default)]
pub struct TokenStreamAccumulator {
    buffer: String,
    fragments: usize,
}

impl TokenStreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the stream and returns the concatenated reply.
    ///
    /// An exhausted stream with no fragments yields an empty string.
    ///
    /// # Errors
    ///
    /// - `StreamInterrupted` on the first error item; items after it are not
    ///   pulled
    pub async fn consume<S, E>(
        mut self,
        fragments: S,
        sink: &mut dyn FragmentSink,
    ) -> Result<String, StreamInterrupted>
    where
        S: Stream<Item = Result<String, E>>,
        E: Display,
    {
        pin_mut!(fragments);

        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => self.push(&fragment, sink),
                Err(err) => {
                    return Err(StreamInterrupted::new(
                        self.buffer,
                        self.fragments,
                        err.to_string(),
                    ));
                }
            }
        }

        tracing::debug!(fragments = self.fragments, chars = self.buffer.len(), "stream exhausted");
        Ok(self.buffer)
    }

    fn push(&mut self, fragment: &str, sink: &mut dyn FragmentSink) {
        if fragment.is_empty() {
            return;
        }
        sink.on_fragment(fragment);
        self.buffer.push_str(fragment);
        self.fragments += 1;
    }
}
