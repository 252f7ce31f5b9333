//! Model domain module.
//!
//! The static model registry and the per-session selection policy that
//! derives the response budget and resets the conversation on a switch.

mod errors;
mod registry;
mod selection;

pub use errors::ModelError;
pub use registry::{ModelRegistry, ModelSpec};
pub use selection::{
    clamp_max_tokens, default_max_tokens, ModelSelection, ModelSelectionPolicy,
    DEFAULT_MAX_TOKENS_CAP, MAX_TOKENS_STEP, MIN_MAX_TOKENS,
};
