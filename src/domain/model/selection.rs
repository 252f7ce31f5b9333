//! Active model and response budget for a session.
//!
//! Switching to a different model invalidates the conversation: the
//! transcript is re-seeded and any running capture dialogue is dropped.
//! Re-selecting the active model is a no-op.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{CaptureState, TranscriptStore};

use super::errors::ModelError;
use super::registry::{ModelRegistry, ModelSpec};

/// Smallest response budget the backend accepts.
pub const MIN_MAX_TOKENS: u32 = 512;

/// Granularity of the budget picker.
pub const MAX_TOKENS_STEP: u32 = 512;

/// Upper bound of the default budget, whatever the model ceiling.
pub const DEFAULT_MAX_TOKENS_CAP: u32 = 32_768;

/// The model in use and the requested response budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub model_id: String,
    pub token_ceiling: u32,
    pub requested_max_tokens: u32,
}

impl ModelSelection {
    /// Selection with the default budget for the given model.
    pub fn for_model(spec: &ModelSpec) -> Self {
        Self {
            model_id: spec.id.clone(),
            token_ceiling: spec.token_ceiling,
            requested_max_tokens: default_max_tokens(spec.token_ceiling),
        }
    }

    /// Lower bound of the budget for this model.
    pub fn lower_bound(&self) -> u32 {
        MIN_MAX_TOKENS.min(self.token_ceiling)
    }
}

/// Budget preselected for a model: the ceiling, capped at 32768.
pub fn default_max_tokens(token_ceiling: u32) -> u32 {
    DEFAULT_MAX_TOKENS_CAP.min(token_ceiling)
}

/// Clamps any requested budget into `[lower, ceiling]`.
pub fn clamp_max_tokens(value: i64, token_ceiling: u32) -> u32 {
    let lower = MIN_MAX_TOKENS.min(token_ceiling);
    value.clamp(i64::from(lower), i64::from(token_ceiling)) as u32
}

/// Maps model identifiers to ceilings and keeps the session's selection.
#[derive(Debug, Clone)]
pub struct ModelSelectionPolicy {
    registry: ModelRegistry,
    selection: ModelSelection,
}

impl ModelSelectionPolicy {
    /// Starts with the registry's default model.
    pub fn new(registry: ModelRegistry) -> Self {
        let selection = ModelSelection::for_model(registry.default_model());
        Self {
            registry,
            selection,
        }
    }

    /// Starts with an explicit model.
    ///
    /// # Errors
    ///
    /// - `UnknownModel` if the identifier is not registered
    pub fn with_initial_model(registry: ModelRegistry, model_id: &str) -> Result<Self, ModelError> {
        let selection = ModelSelection::for_model(registry.get(model_id)?);
        Ok(Self {
            registry,
            selection,
        })
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &ModelSelection {
        &self.selection
    }

    pub fn model_id(&self) -> &str {
        &self.selection.model_id
    }

    pub fn requested_max_tokens(&self) -> u32 {
        self.selection.requested_max_tokens
    }

    /// Activates a model. Returns `true` when the model changed, in which
    /// case the transcript was re-seeded and the capture state cleared.
    ///
    /// # Errors
    ///
    /// - `UnknownModel` if the identifier is not registered; nothing is
    ///   mutated
    pub fn select_model(
        &mut self,
        model_id: &str,
        system_prompt: &str,
        transcript: &mut TranscriptStore,
        capture: &mut CaptureState,
    ) -> Result<bool, ModelError> {
        let spec = self.registry.get(model_id)?;

        if spec.id == self.selection.model_id {
            return Ok(false);
        }

        let previous = std::mem::replace(&mut self.selection, ModelSelection::for_model(spec));
        transcript.reset(system_prompt);
        capture.clear();

        tracing::info!(
            from = %previous.model_id,
            to = %self.selection.model_id,
            max_tokens = self.selection.requested_max_tokens,
            "model switched; transcript reset"
        );
        Ok(true)
    }

    /// Sets the response budget, clamping out-of-range input.
    pub fn set_requested_max_tokens(&mut self, value: i64) -> u32 {
        let clamped = clamp_max_tokens(value, self.selection.token_ceiling);
        if i64::from(clamped) != value {
            tracing::debug!(requested = value, clamped, "max tokens clamped");
        }
        self.selection.requested_max_tokens = clamped;
        clamped
    }
}

impl Default for ModelSelectionPolicy {
    fn default() -> Self {
        Self::new(ModelRegistry::builtin().clone())
    }
}
