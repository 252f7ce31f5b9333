//! Mock AI Provider for testing.
//!
//! Provides a scripted implementation of the AIProvider port so sessions can
//! be driven end to end without network access.
//!
//! # Features
//!
//! - Queued replies streamed as explicit fragments
//! - Mid-stream failure injection (fragments, then an error)
//! - Error injection when the stream is opened
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_fragments(["Hel", "lo"])
//!     .with_interrupted(["Part"], MockError::Network { message: "reset".into() });
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, ChunkStream, CompletionRequest, FinishReason, ProviderInfo, StreamChunk,
    TokenUsage,
};

/// Reply used once the queue is exhausted.
pub const DEFAULT_MOCK_REPLY: &str = "Mock response";

/// Scripted AI provider.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Scripted replies, consumed in order.
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    info: ProviderInfo,
    /// Simulated latency before the stream opens.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Stream these fragments, then finish normally.
    Fragments {
        fragments: Vec<String>,
        finish_reason: FinishReason,
    },
    /// Stream these fragments, then fail.
    Interrupted {
        fragments: Vec<String>,
        error: MockError,
    },
    /// Fail before the first fragment.
    Error(MockError),
}

/// Mock error types.
#[derive(Debug, Clone)]
pub enum MockError {
    RateLimited { retry_after_secs: u32 },
    ContextTooLong,
    Unavailable { message: String },
    AuthenticationFailed,
    Network { message: String },
    Timeout { timeout_secs: u32 },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::ContextTooLong => AIError::ContextTooLong,
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::network(message),
            MockError::Timeout { timeout_secs } => AIError::Timeout { timeout_secs },
        }
    }
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockAIProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock://local").with_streaming(true),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a reply split on whitespace, one word per fragment.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        let content = content.into();
        let mut words: Vec<String> = content.split_inclusive(' ').map(str::to_string).collect();
        if words.is_empty() {
            words.push(content);
        }
        self.push(MockResponse::Fragments {
            fragments: words,
            finish_reason: FinishReason::Stop,
        })
    }

    /// Queues a reply streamed as exactly these fragments.
    pub fn with_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockResponse::Fragments {
            fragments: fragments.into_iter().map(Into::into).collect(),
            finish_reason: FinishReason::Stop,
        })
    }

    /// Queues a reply that fails after delivering `fragments`.
    pub fn with_interrupted<I, S>(self, fragments: I, error: MockError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockResponse::Interrupted {
            fragments: fragments.into_iter().map(Into::into).collect(),
            error,
        })
    }

    /// Queues a failure raised when the stream is opened.
    pub fn with_error(self, error: MockError) -> Self {
        self.push(MockResponse::Error(error))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn push(self, response: MockResponse) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    /// Returns the most recent call, if any.
    pub fn last_call(&self) -> Option<CompletionRequest> {
        lock(&self.calls).last().cloned()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Fragments {
                fragments: vec![DEFAULT_MOCK_REPLY.to_string()],
                finish_reason: FinishReason::Stop,
            })
    }

    async fn record(&self, request: CompletionRequest) {
        lock(&self.calls).push(request);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

fn usage_for(fragments: &[String]) -> TokenUsage {
    TokenUsage::new(10, fragments.len() as u32)
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn stream_complete(&self, request: CompletionRequest) -> Result<ChunkStream, AIError> {
        self.record(request).await;

        match self.next_response() {
            MockResponse::Fragments {
                fragments,
                finish_reason,
            } => {
                let usage = usage_for(&fragments);
                let chunks = stream::iter(
                    fragments
                        .into_iter()
                        .map(|f| Ok(StreamChunk::content(f)))
                        .collect::<Vec<_>>(),
                );
                let last = stream::once(async move {
                    Ok(StreamChunk::final_chunk(finish_reason, Some(usage)))
                });
                Ok(Box::pin(chunks.chain(last)))
            }
            MockResponse::Interrupted { fragments, error } => {
                let chunks = stream::iter(
                    fragments
                        .into_iter()
                        .map(|f| Ok(StreamChunk::content(f)))
                        .collect::<Vec<_>>(),
                );
                let failure = stream::once(async move { Err(AIError::from(error)) });
                Ok(Box::pin(chunks.chain(failure)))
            }
            MockResponse::Error(error) => Err(error.into()),
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Message;
    use crate::domain::foundation::SessionId;
    use crate::ports::RequestMetadata;

    fn test_request() -> CompletionRequest {
        CompletionRequest::new("llama3-8b-8192", RequestMetadata::new(SessionId::new(), "trace-123"))
            .with_messages(vec![Message::user("Hello")])
    }

    async fn drain(stream: ChunkStream) -> Vec<Result<StreamChunk, AIError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn streams_configured_fragments_then_final_chunk() {
        let provider = MockAIProvider::new().with_fragments(["Hel", "lo"]);

        let items = drain(provider.stream_complete(test_request()).await.unwrap()).await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().delta, "Hel");
        assert_eq!(items[1].as_ref().unwrap().delta, "lo");
        assert!(items[2].as_ref().unwrap().is_final());
    }

    #[tokio::test]
    async fn with_response_splits_on_spaces_and_keeps_them() {
        let provider = MockAIProvider::new().with_response("Hello big world");

        let items = drain(provider.stream_complete(test_request()).await.unwrap()).await;
        let text: String = items.into_iter().map(|c| c.unwrap().delta).collect();

        assert_eq!(text, "Hello big world");
    }

    #[tokio::test]
    async fn interrupted_reply_fails_after_fragments() {
        let provider = MockAIProvider::new().with_interrupted(
            ["Part"],
            MockError::Network {
                message: "reset".to_string(),
            },
        );

        let items = drain(provider.stream_complete(test_request()).await.unwrap()).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().delta, "Part");
        assert!(matches!(items[1], Err(AIError::Network(_))));
    }

    #[tokio::test]
    async fn open_error_is_returned_before_streaming() {
        let provider = MockAIProvider::new().with_error(MockError::Unavailable {
            message: "Service down".to_string(),
        });

        match provider.stream_complete(test_request()).await {
            Ok(_) => panic!("Expected error, got stream"),
            Err(err) => assert!(matches!(err, AIError::Unavailable { .. })),
        }
    }

    #[tokio::test]
    async fn final_chunk_reports_usage() {
        let provider = MockAIProvider::new().with_fragments(["a", "b"]);

        let items = drain(provider.stream_complete(test_request()).await.unwrap()).await;

        let last = items.last().unwrap().as_ref().unwrap();
        assert_eq!(last.finish_reason, Some(FinishReason::Stop));
        assert_eq!(last.usage, Some(TokenUsage::new(10, 2)));
    }

    #[tokio::test]
    async fn falls_back_to_default_reply_when_exhausted() {
        let provider = MockAIProvider::new();

        let items = drain(provider.stream_complete(test_request()).await.unwrap()).await;
        let text: String = items.into_iter().map(|c| c.unwrap().delta).collect();

        assert_eq!(text, DEFAULT_MOCK_REPLY);
    }

    #[tokio::test]
    async fn tracks_calls() {
        let provider = MockAIProvider::new();
        assert_eq!(provider.call_count(), 0);

        provider.stream_complete(test_request()).await.unwrap();
        provider.stream_complete(test_request()).await.unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.last_call().unwrap().messages[0].content(), "Hello");

        provider.clear_calls();
        assert!(provider.get_calls().is_empty());
    }
}
