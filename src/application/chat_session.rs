//! Chat session controller.
//!
//! One `ChatSession` per visitor. Each turn appends the visitor's message,
//! lets the intent router decide between the capture dialogue and the
//! completion backend, and commits the assistant reply to the transcript.
//!
//! Error recovery:
//! - an illegal capture transition forces the dialogue back to idle
//! - a persistence failure leaves the dialogue idle without a confirmation
//! - an interrupted stream commits no assistant message

use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::conversation::{
    CaptureError, CaptureState, ContactCapture, IntentRouter, Message, Role, Route,
    StreamInterrupted, TokenStreamAccumulator, TranscriptError, TranscriptStore, SYSTEM_PROMPT,
};
use crate::domain::foundation::{DomainError, ErrorCode, SessionId};
use crate::domain::model::{ModelError, ModelSelectionPolicy};
use crate::ports::{
    AIProvider, CompletionRequest, ContactSink, FragmentSink, RequestMetadata, SinkError,
};

/// How a turn was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A fixed capture prompt or confirmation; nothing was streamed.
    Static { reply: String },
    /// A backend reply, already shown fragment by fragment.
    Streamed { reply: String },
    /// Empty input; the transcript is unchanged.
    Ignored,
}

impl TurnOutcome {
    pub fn reply(&self) -> Option<&str> {
        match self {
            TurnOutcome::Static { reply } | TurnOutcome::Streamed { reply } => Some(reply.as_str()),
            TurnOutcome::Ignored => None,
        }
    }
}

/// Errors surfaced to the front end.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidRole(#[from] TranscriptError),

    #[error(transparent)]
    UnknownModel(#[from] ModelError),

    #[error("illegal state transition: {0}")]
    IllegalStateTransition(DomainError),

    #[error(transparent)]
    StreamInterrupted(#[from] StreamInterrupted),

    #[error("failed to save contact details: {0}")]
    Persistence(SinkError),
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::InvalidRole(e) => e.code(),
            SessionError::UnknownModel(e) => e.code(),
            SessionError::IllegalStateTransition(_) => ErrorCode::IllegalStateTransition,
            SessionError::StreamInterrupted(e) => e.code(),
            SessionError::Persistence(_) => ErrorCode::PersistenceFailed,
        }
    }
}

/// Per-visitor conversation state plus the collaborators that act on it.
pub struct ChatSession {
    id: SessionId,
    system_prompt: String,
    transcript: TranscriptStore,
    capture_state: CaptureState,
    policy: ModelSelectionPolicy,
    router: IntentRouter,
    capture: ContactCapture,
    provider: Arc<dyn AIProvider>,
}

impl ChatSession {
    /// Creates a session on the default model with a freshly seeded transcript.
    pub fn new(provider: Arc<dyn AIProvider>, contacts: Arc<dyn ContactSink>) -> Self {
        Self {
            id: SessionId::new(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            transcript: TranscriptStore::seeded(SYSTEM_PROMPT),
            capture_state: CaptureState::idle(),
            policy: ModelSelectionPolicy::default(),
            router: IntentRouter::default(),
            capture: ContactCapture::new(contacts),
            provider,
        }
    }

    /// Replaces the model policy. The transcript is re-seeded.
    pub fn with_policy(mut self, policy: ModelSelectionPolicy) -> Self {
        self.policy = policy;
        self.reset_conversation();
        self
    }

    pub fn with_router(mut self, router: IntentRouter) -> Self {
        self.router = router;
        self
    }

    /// Replaces the behavioral instruction. The transcript is re-seeded.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self.reset_conversation();
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    /// Messages a front end should render (system instruction excluded).
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.transcript.visible_messages()
    }

    pub fn capture_state(&self) -> &CaptureState {
        &self.capture_state
    }

    pub fn model_id(&self) -> &str {
        self.policy.model_id()
    }

    pub fn max_tokens(&self) -> u32 {
        self.policy.requested_max_tokens()
    }

    pub fn policy(&self) -> &ModelSelectionPolicy {
        &self.policy
    }

    /// Switches model. Returns `true` if the conversation was reset.
    ///
    /// # Errors
    ///
    /// - `UnknownModel` if the identifier is not registered; the session is
    ///   left untouched
    pub fn select_model(&mut self, model_id: &str) -> Result<bool, SessionError> {
        self.policy
            .select_model(
                model_id,
                &self.system_prompt,
                &mut self.transcript,
                &mut self.capture_state,
            )
            .map_err(|err| {
                tracing::error!(session_id = %self.id, error = %err, "model selection rejected");
                SessionError::UnknownModel(err)
            })
    }

    /// Sets the response budget and returns the clamped value in effect.
    pub fn set_max_tokens(&mut self, value: i64) -> u32 {
        self.policy.set_requested_max_tokens(value)
    }

    /// Appends externally tagged messages, e.g. history restored by a front end.
    ///
    /// All tags are checked before anything is appended. Only user and
    /// assistant turns are accepted; the session owns its single system
    /// message.
    ///
    /// # Errors
    ///
    /// - `InvalidRole` if any tag is not user or assistant
    pub fn import_history<I, T, C>(&mut self, entries: I) -> Result<usize, SessionError>
    where
        I: IntoIterator<Item = (T, C)>,
        T: AsRef<str>,
        C: Into<String>,
    {
        let parsed = entries
            .into_iter()
            .map(|(tag, content)| -> Result<Message, TranscriptError> {
                let tag = tag.as_ref();
                match tag.parse::<Role>()? {
                    Role::System => Err(TranscriptError::invalid_role(tag)),
                    role => Ok(Message::new(role, content)),
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                tracing::warn!(session_id = %self.id, error = %err, "history import rejected");
                SessionError::InvalidRole(err)
            })?;

        let count = parsed.len();
        for message in parsed {
            self.transcript.append(message.role(), message.content());
        }
        Ok(count)
    }

    /// Handles one visitor turn.
    ///
    /// Backend replies are forwarded to `display` fragment by fragment;
    /// capture prompts are returned as `Static` and not sent to `display`.
    ///
    /// # Errors
    ///
    /// - `IllegalStateTransition` if the capture dialogue was driven
    ///   inconsistently; the dialogue is reset to idle
    /// - `Persistence` if the contact could not be saved
    /// - `StreamInterrupted` if the backend failed before or during the
    ///   reply; no assistant message is committed
    pub async fn handle_utterance(
        &mut self,
        text: &str,
        display: &mut dyn FragmentSink,
    ) -> Result<TurnOutcome, SessionError> {
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        let span = tracing::info_span!(
            "turn",
            session_id = %self.id,
            model = %self.policy.model_id(),
        );
        self.run_turn(text, display).instrument(span).await
    }

    async fn run_turn(
        &mut self,
        text: &str,
        display: &mut dyn FragmentSink,
    ) -> Result<TurnOutcome, SessionError> {
        self.transcript.append(Role::User, text);

        let route = self
            .router
            .route(
                text,
                &mut self.capture_state,
                &mut self.transcript,
                &self.capture,
            )
            .map_err(|err| self.recover(err))?;

        match route {
            Route::ToCapture {
                started: Some(step),
            } => Ok(TurnOutcome::Static {
                reply: step.reply().to_string(),
            }),
            Route::ToCapture { started: None } => {
                let step = self
                    .capture
                    .advance(&mut self.capture_state, &mut self.transcript, text)
                    .await
                    .map_err(|err| self.recover(err))?;
                Ok(TurnOutcome::Static {
                    reply: step.reply().to_string(),
                })
            }
            Route::ToBackend => self.stream_reply(display).await,
        }
    }

    async fn stream_reply(
        &mut self,
        display: &mut dyn FragmentSink,
    ) -> Result<TurnOutcome, SessionError> {
        let request = CompletionRequest::new(
            self.policy.model_id(),
            RequestMetadata::new(self.id, Uuid::new_v4().to_string()),
        )
        .with_messages(self.transcript.snapshot_for_backend())
        .with_max_tokens(self.policy.requested_max_tokens());

        let chunks = match self.provider.stream_complete(request).await {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::warn!(error = %err, "backend stream could not be opened");
                return Err(StreamInterrupted::before_first_fragment(err.to_string()).into());
            }
        };

        let deltas = chunks.map(|item| item.map(|chunk| chunk.delta));
        let reply = TokenStreamAccumulator::new()
            .consume(deltas, display)
            .await
            .map_err(|err| {
                tracing::warn!(
                    fragments = err.fragments,
                    reason = %err.reason,
                    "backend stream interrupted"
                );
                SessionError::StreamInterrupted(err)
            })?;

        self.transcript.append(Role::Assistant, reply.clone());
        tracing::info!(chars = reply.len(), "assistant reply committed");
        Ok(TurnOutcome::Streamed { reply })
    }

    fn recover(&mut self, err: CaptureError) -> SessionError {
        self.capture_state.clear();
        match err {
            CaptureError::IllegalStateTransition(inner) => {
                tracing::error!(error = %inner, "capture dialogue reset after illegal transition");
                SessionError::IllegalStateTransition(inner)
            }
            CaptureError::Persistence(inner) => {
                tracing::error!(error = %inner, "contact details could not be saved");
                SessionError::Persistence(inner)
            }
        }
    }

    fn reset_conversation(&mut self) {
        self.transcript.reset(self.system_prompt.clone());
        self.capture_state.clear();
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("model", &self.policy.model_id())
            .field("messages", &self.transcript.len())
            .field("capture", &self.capture_state.phase())
            .finish_non_exhaustive()
    }
}
