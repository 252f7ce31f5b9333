//! Static registry of selectable completion models.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::errors::ModelError;

/// One selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Identifier sent to the backend.
    pub id: String,
    /// Human-readable name shown in the model picker.
    pub display_name: String,
    /// Largest response budget the model accepts.
    pub token_ceiling: u32,
    /// Organisation that publishes the model.
    pub vendor: String,
}

impl ModelSpec {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        token_ceiling: u32,
        vendor: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            token_ceiling,
            vendor: vendor.into(),
        }
    }
}

/// Ordered set of registered models. Order is the picker order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
    default_index: usize,
}

/// Models offered by the hosted backend.
static BUILTIN: Lazy<ModelRegistry> = Lazy::new(|| ModelRegistry {
    models: vec![
        ModelSpec::new("gemma2-9b-it", "Gemma2-9b-it", 8192, "Google"),
        ModelSpec::new("llama-3.3-70b-versatile", "LLaMA3.3-70b-versatile", 128_000, "Meta"),
        ModelSpec::new("llama-3.1-8b-instant", "LLaMA3.1-8b-instant", 128_000, "Meta"),
        ModelSpec::new("llama3-70b-8192", "LLaMA3-70b-8192", 8192, "Meta"),
        ModelSpec::new("llama3-8b-8192", "LLaMA3-8b-8192", 8192, "Meta"),
        ModelSpec::new("mixtral-8x7b-32768", "Mixtral-8x7b-Instruct-v0.1", 32_768, "Mistral"),
    ],
    default_index: 4,
});

impl ModelRegistry {
    /// The built-in registry.
    pub fn builtin() -> &'static ModelRegistry {
        &BUILTIN
    }

    /// Builds a registry from explicit entries; the first entry is the default.
    ///
    /// # Errors
    ///
    /// - `EmptyRegistry` if no models are given
    pub fn from_models(models: Vec<ModelSpec>) -> Result<Self, ModelError> {
        if models.is_empty() {
            return Err(ModelError::EmptyRegistry);
        }
        Ok(Self {
            models,
            default_index: 0,
        })
    }

    /// Looks up a model by identifier.
    ///
    /// # Errors
    ///
    /// - `UnknownModel` if the identifier is not registered
    pub fn get(&self, model_id: &str) -> Result<&ModelSpec, ModelError> {
        self.models
            .iter()
            .find(|m| m.id == model_id)
            .ok_or_else(|| ModelError::unknown(model_id))
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.models.iter().any(|m| m.id == model_id)
    }

    /// Model preselected when a session starts.
    pub fn default_model(&self) -> &ModelSpec {
        &self.models[self.default_index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
