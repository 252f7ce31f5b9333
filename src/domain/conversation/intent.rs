//! Intent routing for incoming visitor utterances.
//!
//! A running capture dialogue always consumes the turn. Otherwise the
//! utterance is lowercased and checked for any of the subscription keywords
//! as a plain substring, so "information" also matches inside unrelated
//! sentences. Matching enters the capture dialogue; anything else goes to
//! the completion backend.

use super::capture::{CaptureState, CaptureStep, ContactCapture};
use super::errors::CaptureError;
use super::transcript::TranscriptStore;

/// Keywords that start the capture dialogue.
pub const SUBSCRIPTION_KEYWORDS: [&str; 5] = [
    "subscribe",
    "sign up",
    "provide info",
    "information",
    "register",
];

/// Where a turn is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The capture dialogue owns this turn.
    ///
    /// `started` carries the opening step when this utterance entered the
    /// dialogue; it is `None` when a running dialogue should consume it.
    ToCapture { started: Option<CaptureStep> },
    /// Forward to the completion backend.
    ToBackend,
}

/// Keyword-based router in front of the capture dialogue.
#[derive(Debug, Clone)]
pub struct IntentRouter {
    keywords: Vec<String>,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::with_keywords(SUBSCRIPTION_KEYWORDS)
    }
}

impl IntentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router over a custom keyword set. Keywords are lowercased.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns true if the utterance contains any keyword (case-insensitive).
    pub fn matches(&self, utterance: &str) -> bool {
        let lowered = utterance.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Decides where the utterance goes, entering the capture dialogue when
    /// an idle session mentions a keyword.
    ///
    /// # Errors
    ///
    /// - `IllegalStateTransition` only if the capture state is inconsistent
    pub fn route(
        &self,
        utterance: &str,
        state: &mut CaptureState,
        transcript: &mut TranscriptStore,
        capture: &ContactCapture,
    ) -> Result<Route, CaptureError> {
        if state.is_active() {
            return Ok(Route::ToCapture { started: None });
        }

        if self.matches(utterance) {
            let step = capture.begin(state, transcript)?;
            return Ok(Route::ToCapture {
                started: Some(step),
            });
        }

        Ok(Route::ToBackend)
    }
}
