//! Model selection errors.

use crate::domain::foundation::ErrorCode;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown model '{model_id}'")]
    UnknownModel { model_id: String },

    #[error("model registry is empty")]
    EmptyRegistry,
}

impl ModelError {
    pub fn unknown(model_id: impl Into<String>) -> Self {
        ModelError::UnknownModel {
            model_id: model_id.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ModelError::UnknownModel { .. } => ErrorCode::UnknownModel,
            ModelError::EmptyRegistry => ErrorCode::InternalError,
        }
    }
}
