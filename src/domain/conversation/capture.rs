//! Contact capture dialogue.
//!
//! A scripted two-field sub-dialogue that collects a visitor's name and then
//! their email, hands the pair to the contact sink and confirms.
//!
//! ```text
//! Idle --(intent detected)--> AwaitingName --(utterance)--> AwaitingEmail --(utterance)--> Idle
//! ```
//!
//! Values are stored verbatim. There is no validation or retry path.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, StateMachine};
use crate::ports::{ContactRecord, ContactSink};

use super::errors::CaptureError;
use super::message::Role;
use super::transcript::TranscriptStore;

/// Assistant prompt appended when the dialogue starts.
pub const NAME_PROMPT: &str = "Sure, I'd be happy to help you subscribe. Please provide your name:";

/// Assistant prompt appended once the name is known.
pub const EMAIL_PROMPT: &str = "Please also provide your email address:";

/// Renders the confirmation sent after a pair has been saved.
pub fn confirmation_message(name: &str, email: &str) -> String {
    format!(
        "Thank you for the information, {}! I've saved your details and you'll receive an email at {} soon.",
        name, email
    )
}

/// Which field the dialogue is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapturePhase {
    #[default]
    Idle,
    AwaitingName,
    AwaitingEmail,
}

impl StateMachine for CapturePhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CapturePhase::*;
        matches!(
            (self, target),
            (Idle, AwaitingName) | (AwaitingName, AwaitingEmail) | (AwaitingEmail, Idle)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CapturePhase::*;
        match self {
            Idle => vec![AwaitingName],
            AwaitingName => vec![AwaitingEmail],
            AwaitingEmail => vec![Idle],
        }
    }
}

/// Session-owned progress of the capture dialogue.
///
/// # Invariants
///
/// - `active == false` implies both fields are unset
/// - while active, name is filled strictly before email
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureState {
    active: bool,
    name: Option<String>,
    email: Option<String>,
}

impl CaptureState {
    /// Inactive, empty state.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Derives the dialogue phase from the stored fields.
    pub fn phase(&self) -> CapturePhase {
        match (self.active, &self.name) {
            (false, _) => CapturePhase::Idle,
            (true, None) => CapturePhase::AwaitingName,
            (true, Some(_)) => CapturePhase::AwaitingEmail,
        }
    }

    /// True when inactive with both fields unset.
    pub fn is_idle_and_empty(&self) -> bool {
        !self.active && self.name.is_none() && self.email.is_none()
    }

    /// Resets to inactive and empty.
    pub fn clear(&mut self) {
        *self = Self::idle();
    }
}

/// Result of one capture step, carrying the text shown to the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStep {
    /// The dialogue started and asked for a name.
    AskedForName { prompt: String },
    /// The name was stored and the email was requested.
    AskedForEmail { prompt: String },
    /// Both values were persisted and confirmed.
    Completed {
        record: ContactRecord,
        confirmation: String,
    },
}

impl CaptureStep {
    /// Assistant text appended to the transcript for this step.
    pub fn reply(&self) -> &str {
        match self {
            CaptureStep::AskedForName { prompt } | CaptureStep::AskedForEmail { prompt } => prompt,
            CaptureStep::Completed { confirmation, .. } => confirmation,
        }
    }
}

/// Drives the capture dialogue against session-owned state.
#[derive(Clone)]
pub struct ContactCapture {
    sink: Arc<dyn ContactSink>,
}

impl ContactCapture {
    pub fn new(sink: Arc<dyn ContactSink>) -> Self {
        Self { sink }
    }

    /// `Idle -> AwaitingName`: marks the state active and asks for a name.
    ///
    /// # Errors
    ///
    /// - `IllegalStateTransition` if a dialogue is already running
    pub fn begin(
        &self,
        state: &mut CaptureState,
        transcript: &mut TranscriptStore,
    ) -> Result<CaptureStep, CaptureError> {
        state.phase().transition_to(CapturePhase::AwaitingName)?;

        *state = CaptureState {
            active: true,
            name: None,
            email: None,
        };
        transcript.append(Role::Assistant, NAME_PROMPT);
        tracing::debug!("contact capture started");

        Ok(CaptureStep::AskedForName {
            prompt: NAME_PROMPT.to_string(),
        })
    }

    /// Feeds one visitor utterance to the running dialogue.
    ///
    /// # Errors
    ///
    /// - `IllegalStateTransition` if the dialogue is idle
    /// - `Persistence` if the completed pair could not be saved
    pub async fn advance(
        &self,
        state: &mut CaptureState,
        transcript: &mut TranscriptStore,
        utterance: &str,
    ) -> Result<CaptureStep, CaptureError> {
        match state.phase() {
            CapturePhase::AwaitingName => self.accept_name(state, transcript, utterance),
            CapturePhase::AwaitingEmail => self.accept_email(state, transcript, utterance).await,
            CapturePhase::Idle => Err(CaptureError::IllegalStateTransition(
                DomainError::new(
                    ErrorCode::IllegalStateTransition,
                    "Capture dialogue is idle; no field is outstanding",
                )
                .with_detail("from", "Idle"),
            )),
        }
    }

    /// `AwaitingName -> AwaitingEmail`: stores the name verbatim.
    pub fn accept_name(
        &self,
        state: &mut CaptureState,
        transcript: &mut TranscriptStore,
        utterance: &str,
    ) -> Result<CaptureStep, CaptureError> {
        state.phase().transition_to(CapturePhase::AwaitingEmail)?;

        state.name = Some(utterance.to_string());
        transcript.append(Role::Assistant, EMAIL_PROMPT);
        tracing::debug!("contact capture stored name");

        Ok(CaptureStep::AskedForEmail {
            prompt: EMAIL_PROMPT.to_string(),
        })
    }

    /// `AwaitingEmail -> Idle`: stores the email, persists the pair,
    /// confirms and clears the state.
    ///
    /// The state is cleared even when persistence fails; no confirmation is
    /// appended in that case.
    pub async fn accept_email(
        &self,
        state: &mut CaptureState,
        transcript: &mut TranscriptStore,
        utterance: &str,
    ) -> Result<CaptureStep, CaptureError> {
        state.phase().transition_to(CapturePhase::Idle)?;

        state.email = Some(utterance.to_string());
        let record = ContactRecord::new(
            state.name.take().unwrap_or_default(),
            state.email.take().unwrap_or_default(),
        );
        state.clear();

        self.sink.append(record.clone()).await?;

        let confirmation = confirmation_message(&record.name, &record.email);
        transcript.append(Role::Assistant, confirmation.clone());
        tracing::info!("contact capture completed");

        Ok(CaptureStep::Completed {
            record,
            confirmation,
        })
    }
}

impl std::fmt::Debug for ContactCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactCapture").finish_non_exhaustive()
    }
}
