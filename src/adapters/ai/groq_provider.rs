//! Groq Provider - Implementation of AIProvider for Groq's chat completions.
//!
//! Groq exposes an OpenAI-compatible `/chat/completions` endpoint, so this
//! adapter works against any compatible base URL.
//!
//! # Configuration
//!
//! ```ignore
//! let config = GroqConfig::new(api_key)
//!     .with_base_url("https://api.groq.com/openai/v1")
//!     .with_timeout(Duration::from_secs(60));
//!
//! let provider = GroqProvider::new(config)?;
//! ```
//!
//! # Streaming
//!
//! Uses Server-Sent Events. Raw bytes are buffered until a full line is
//! available, each `data:` line is parsed into a `StreamChunk`, and the
//! `[DONE]` marker (or a chunk carrying a finish reason) completes the
//! stream. A body that ends before completion yields a trailing error so a
//! truncated reply is never mistaken for a whole one.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, ChunkStream, CompletionRequest, FinishReason, ProviderInfo, StreamChunk,
    TokenUsage,
};

/// Default endpoint of the hosted backend.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Configuration for the Groq provider.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries when opening the stream fails transiently.
    pub max_retries: u32,
}

impl GroqConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            base_url: GROQ_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Groq API provider implementation.
pub struct GroqProvider {
    config: GroqConfig,
    client: Client,
}

impl GroqProvider {
    /// Creates a new provider with the given configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the HTTP client cannot be built
    pub fn new(config: GroqConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Converts our request to the wire format.
    fn to_wire_request(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role().as_str().to_string(),
                    content: m.content().to_string(),
                })
                .collect(),
            max_tokens: request.max_tokens,
            stream: true,
        }
    }

    /// Sends the request and checks the status; no body has been read yet.
    async fn open(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        let wire = self.to_wire_request(request);

        tracing::debug!(
            model = %wire.model,
            messages = wire.messages.len(),
            trace_id = %request.metadata.trace_id,
            "opening completion stream"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key())
            .json(&wire)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    AIError::network(format!("Connection failed: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })?;

        Self::handle_response_status(response).await
    }

    /// Maps a non-success HTTP status to an error.
    async fn handle_response_status(response: Response) -> Result<Response, AIError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        Err(Self::status_error(status.as_u16(), &error_body))
    }

    fn status_error(status: u16, error_body: &str) -> AIError {
        match status {
            401 | 403 => AIError::AuthenticationFailed,
            429 => AIError::rate_limited(Self::parse_retry_after(error_body)),
            400 | 413
                if error_body.contains("context_length_exceeded")
                    || error_body.contains("maximum context length") =>
            {
                AIError::ContextTooLong
            }
            400 | 404 | 413 | 422 => AIError::InvalidRequest(error_body.to_string()),
            500..=599 => AIError::unavailable(format!("Server error {}: {}", status, error_body)),
            _ => AIError::network(format!("Unexpected status {}: {}", status, error_body)),
        }
    }

    /// Parses "try again in Xs" from an error body, defaulting to 30 seconds.
    fn parse_retry_after(error_body: &str) -> u32 {
        let message = serde_json::from_str::<serde_json::Value>(error_body)
            .ok()
            .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string));

        message
            .as_deref()
            .and_then(|s| s.find("try again in ").map(|idx| &s[idx + 13..]))
            .and_then(|rest| {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse::<u32>().ok()
            })
            .unwrap_or(30)
    }

    /// Turns the response body into a chunk stream.
    fn decode(response: Response) -> ChunkStream {
        let body = response.bytes_stream().map(Some).chain(stream::once(async { None }));

        let chunks = body
            .scan(SseDecoder::default(), |decoder, item| {
                let items = match item {
                    Some(Ok(bytes)) => decoder.feed(&bytes),
                    Some(Err(e)) => decoder.fail(AIError::network(format!("Stream error: {}", e))),
                    None => decoder.finish(),
                };
                futures::future::ready(Some(items))
            })
            .flat_map(stream::iter);

        Box::pin(chunks)
    }
}

#[async_trait]
impl AIProvider for GroqProvider {
    async fn stream_complete(&self, request: CompletionRequest) -> Result<ChunkStream, AIError> {
        let mut retry_count = 0;

        // Retrying is only safe before the first byte of the body is read.
        loop {
            match self.open(&request).await {
                Ok(response) => return Ok(Self::decode(response)),
                Err(err) if err.is_retryable() && retry_count < self.config.max_retries => {
                    tracing::warn!(attempt = retry_count + 1, error = %err, "retrying stream open");
                }
                Err(err) => return Err(err),
            }

            // Exponential backoff: 1s, 2s, 4s, ...
            sleep(Duration::from_secs(1 << retry_count)).await;
            retry_count += 1;
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("groq", &self.config.base_url).with_streaming(true)
    }
}

/// Reassembles SSE lines from raw body bytes and tracks completion.
#[derive(Debug, Default)]
struct SseDecoder {
    /// Bytes after the last newline; may end inside a UTF-8 sequence.
    pending: Vec<u8>,
    /// `[DONE]` or a finish reason was received.
    completed: bool,
    /// An error item was already emitted.
    failed: bool,
}

impl SseDecoder {
    /// Appends bytes and parses every complete line received so far.
    fn feed(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk, AIError>> {
        self.pending.extend_from_slice(bytes);

        let mut results = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let item = match std::str::from_utf8(&line) {
                Ok(text) => self.parse_line(text.trim_end_matches(['\r', '\n'])),
                Err(e) => Some(Err(AIError::parse(format!("SSE line is not valid UTF-8: {}", e)))),
            };
            if let Some(item) = item {
                self.failed |= item.is_err();
                results.push(item);
            }
        }
        results
    }

    /// Emits a transport error unless one was already reported.
    fn fail(&mut self, err: AIError) -> Vec<Result<StreamChunk, AIError>> {
        if self.failed {
            return Vec::new();
        }
        self.failed = true;
        vec![Err(err)]
    }

    /// Called at end of body: an unfinished stream becomes an error.
    fn finish(&mut self) -> Vec<Result<StreamChunk, AIError>> {
        if self.completed {
            return Vec::new();
        }
        let reason = if self.pending.is_empty() {
            "stream ended before completion"
        } else {
            "stream ended in the middle of a line"
        };
        self.fail(AIError::network(reason))
    }

    fn parse_line(&mut self, line: &str) -> Option<Result<StreamChunk, AIError>> {
        let data = line.strip_prefix("data:")?.trim_start();

        if data == "[DONE]" {
            self.completed = true;
            return None;
        }

        let item = parse_sse_data(data)?;
        if matches!(&item, Ok(chunk) if chunk.is_final()) {
            self.completed = true;
        }
        Some(item)
    }
}

/// Parses one `data:` payload. Returns `None` for payloads with nothing to emit.
fn parse_sse_data(data: &str) -> Option<Result<StreamChunk, AIError>> {
    if data.is_empty() {
        return None;
    }

    let chunk = match serde_json::from_str::<StreamResponseChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Some(Err(AIError::parse(format!(
                "Failed to parse SSE chunk: {}",
                e
            ))))
        }
    };

    if let Some(message) = chunk.error.and_then(|e| e.message) {
        return Some(Err(AIError::unavailable(message)));
    }

    let usage = chunk
        .x_groq
        .and_then(|x| x.usage)
        .or(chunk.usage)
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));

    let choice = chunk.choices.into_iter().next()?;

    if let Some(reason) = choice.finish_reason.as_deref() {
        let mut last = StreamChunk::final_chunk(FinishReason::from_wire(reason), usage);
        last.delta = choice.delta.content.unwrap_or_default();
        return Some(Ok(last));
    }

    match choice.delta.content {
        Some(content) if !content.is_empty() => Some(Ok(StreamChunk::content(content))),
        _ => None,
    }
}

// ----- Wire Types -----

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamResponseChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<WireUsage>,
    x_groq: Option<GroqExtension>,
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct GroqExtension {
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{Message, Role};
    use crate::domain::foundation::SessionId;
    use crate::ports::RequestMetadata;

    fn provider() -> GroqProvider {
        GroqProvider::new(GroqConfig::new("test-key")).unwrap()
    }

    fn content_line(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{}\"}},\"finish_reason\":null}}]}}\n\n",
            text
        )
    }

    fn test_request() -> CompletionRequest {
        CompletionRequest::new(
            "llama3-8b-8192",
            RequestMetadata::new(SessionId::new(), "trace"),
        )
        .with_messages(vec![Message::system("be nice"), Message::user("hi")])
        .with_max_tokens(8192)
    }

    #[test]
    fn config_builder_works() {
        let config = GroqConfig::new("test-key")
            .with_base_url("https://custom.api.com/v1/")
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(5);

        assert_eq!(config.base_url, "https://custom.api.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn api_key_is_redacted_in_debug_output() {
        let rendered = format!("{:?}", GroqConfig::new("gsk_secret"));
        assert!(!rendered.contains("gsk_secret"));
    }

    #[test]
    fn wire_request_sends_transcript_verbatim() {
        let request = test_request();

        let wire = serde_json::to_value(provider().to_wire_request(&request)).unwrap();

        assert_eq!(
            wire,
            serde_json::json!({
                "model": "llama3-8b-8192",
                "messages": [
                    {"role": "system", "content": "be nice"},
                    {"role": "user", "content": "hi"}
                ],
                "max_tokens": 8192,
                "stream": true
            })
        );
        assert_eq!(request.messages[0].role(), Role::System);
    }

    #[test]
    fn provider_info_reports_endpoint() {
        let info = provider().provider_info();
        assert_eq!(info.name, "groq");
        assert_eq!(info.endpoint, GROQ_BASE_URL);
        assert!(info.supports_streaming);
    }

    mod sse {
        use super::*;

        fn deltas(items: Vec<Result<StreamChunk, AIError>>) -> Vec<String> {
            items.into_iter().map(|c| c.unwrap().delta).collect()
        }

        #[test]
        fn parses_content_line() {
            let mut decoder = SseDecoder::default();
            let line = r#"data: {"id":"x","choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
            let chunk = decoder.parse_line(line).unwrap().unwrap();
            assert_eq!(chunk, StreamChunk::content("Hello"));
            assert!(!decoder.completed);
        }

        #[test]
        fn skips_role_only_and_empty_deltas() {
            let role_only = r#"{"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#;
            let empty = r#"{"choices":[{"delta":{"content":""},"finish_reason":null}]}"#;
            assert!(parse_sse_data(role_only).is_none());
            assert!(parse_sse_data(empty).is_none());
        }

        #[test]
        fn final_line_with_groq_usage_completes() {
            let mut decoder = SseDecoder::default();
            let line = r#"data: {"choices":[{"delta":{},"finish_reason":"length"}],"x_groq":{"usage":{"prompt_tokens":10,"completion_tokens":5}}}"#;
            let chunk = decoder.parse_line(line).unwrap().unwrap();
            assert!(chunk.is_final());
            assert_eq!(chunk.finish_reason, Some(FinishReason::Length));
            assert_eq!(chunk.usage, Some(TokenUsage::new(10, 5)));
            assert!(decoder.completed);
        }

        #[test]
        fn done_marker_completes_and_comments_emit_nothing() {
            let mut decoder = SseDecoder::default();
            assert!(decoder.parse_line(": keep-alive").is_none());
            assert!(decoder.parse_line("").is_none());
            assert!(!decoder.completed);
            assert!(decoder.parse_line("data: [DONE]").is_none());
            assert!(decoder.completed);
            assert!(decoder.finish().is_empty());
        }

        #[test]
        fn malformed_json_is_an_error() {
            let item = parse_sse_data("{not json").unwrap();
            assert!(matches!(item, Err(AIError::Parse(_))));
        }

        #[test]
        fn in_band_error_is_surfaced() {
            let item = parse_sse_data(r#"{"error":{"message":"overloaded"}}"#).unwrap();
            assert!(matches!(item, Err(AIError::Unavailable { .. })));
        }

        #[test]
        fn joins_lines_split_across_chunks() {
            let mut decoder = SseDecoder::default();

            let first = decoder.feed(br#"data: {"choices":[{"delta":{"content":"Hel"#);
            assert!(first.is_empty());

            let second = decoder.feed(
                b"lo\"},\"finish_reason\":null}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"!\"},\"finish_reason\":null}]}\r\n",
            );
            assert_eq!(deltas(second), vec!["Hello".to_string(), "!".to_string()]);
        }

        #[test]
        fn multibyte_character_split_across_chunks_survives() {
            let line = content_line("café");
            let bytes = line.as_bytes();
            let split = line.find('é').unwrap() + 1;
            let mut decoder = SseDecoder::default();

            let mut items = decoder.feed(&bytes[..split]);
            items.extend(decoder.feed(&bytes[split..]));

            assert_eq!(deltas(items), vec!["café".to_string()]);
        }

        #[test]
        fn invalid_utf8_line_is_a_parse_error() {
            let mut decoder = SseDecoder::default();

            let items = decoder.feed(b"data: {\"x\":\"\xff\"}\n");

            assert_eq!(items.len(), 1);
            assert!(matches!(items[0], Err(AIError::Parse(_))));
        }

        #[test]
        fn end_without_completion_is_an_error() {
            let mut decoder = SseDecoder::default();
            decoder.feed(content_line("Hel").as_bytes());

            let tail = decoder.finish();

            assert_eq!(tail.len(), 1);
            assert!(matches!(tail[0], Err(AIError::Network(_))));
        }

        #[test]
        fn end_inside_a_line_is_an_error() {
            let mut decoder = SseDecoder::default();
            decoder.feed(b"data: {\"choices\":[");

            assert!(matches!(decoder.finish()[..], [Err(AIError::Network(_))]));
        }

        #[test]
        fn error_is_reported_once() {
            let mut decoder = SseDecoder::default();
            assert_eq!(decoder.fail(AIError::network("reset")).len(), 1);
            assert!(decoder.finish().is_empty());
        }
    }

    mod status {
        use super::*;

        #[test]
        fn maps_status_codes() {
            assert!(matches!(
                GroqProvider::status_error(401, ""),
                AIError::AuthenticationFailed
            ));
            assert!(matches!(
                GroqProvider::status_error(429, ""),
                AIError::RateLimited { retry_after_secs: 30 }
            ));
            assert!(matches!(
                GroqProvider::status_error(400, "context_length_exceeded"),
                AIError::ContextTooLong
            ));
            assert!(matches!(
                GroqProvider::status_error(400, "bad model"),
                AIError::InvalidRequest(_)
            ));
            assert!(matches!(
                GroqProvider::status_error(503, "down"),
                AIError::Unavailable { .. }
            ));
        }

        #[test]
        fn parses_retry_after_from_message() {
            let body = r#"{"error":{"message":"Rate limit reached. Please try again in 7s."}}"#;
            assert_eq!(GroqProvider::parse_retry_after(body), 7);
        }

        #[test]
        fn retry_after_defaults_to_thirty_seconds() {
            assert_eq!(GroqProvider::parse_retry_after("not json"), 30);
        }
    }

    mod over_http {
        use super::*;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        /// Serves one request with an event-stream body, then closes.
        async fn serve_once(status_line: &'static str, body: String) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                let head = format!(
                    "{}\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
                    status_line
                );
                socket.write_all(head.as_bytes()).await.unwrap();
                socket.write_all(body.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            });

            format!("http://{}", addr)
        }

        async fn read_request(socket: &mut tokio::net::TcpStream) {
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    if received.len() >= end + 4 + length {
                        return;
                    }
                }
            }
        }

        fn local_provider(base_url: String) -> GroqProvider {
            GroqProvider {
                config: GroqConfig::new("test-key")
                    .with_base_url(base_url)
                    .with_max_retries(0),
                client: Client::builder().no_proxy().build().unwrap(),
            }
        }

        #[tokio::test]
        async fn connection_closed_before_done_yields_error() {
            let base_url = serve_once("HTTP/1.1 200 OK", content_line("Hel")).await;

            let stream = local_provider(base_url)
                .stream_complete(test_request())
                .await
                .unwrap();
            let items: Vec<_> = stream.collect().await;

            assert_eq!(items.len(), 2);
            assert_eq!(items[0].as_ref().unwrap().delta, "Hel");
            assert!(matches!(items[1], Err(AIError::Network(_))));
        }

        #[tokio::test]
        async fn completed_stream_ends_cleanly() {
            let body = format!("{}{}data: [DONE]\n\n", content_line("Hel"), content_line("lo"));
            let base_url = serve_once("HTTP/1.1 200 OK", body).await;

            let stream = local_provider(base_url)
                .stream_complete(test_request())
                .await
                .unwrap();
            let items: Vec<_> = stream.collect().await;

            let text: String = items.into_iter().map(|c| c.unwrap().delta).collect();
            assert_eq!(text, "Hello");
        }

        #[tokio::test]
        async fn error_status_fails_to_open() {
            let base_url = serve_once("HTTP/1.1 401 Unauthorized", String::new()).await;

            let result = local_provider(base_url).stream_complete(test_request()).await;

            assert!(matches!(result, Err(AIError::AuthenticationFailed)));
        }
    }
}
