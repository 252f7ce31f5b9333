//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `SUPPORT_CHAT` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use support_chat::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//!
//! println!("Contacts go to {}", config.capture.csv_path);
//! # Ok::<(), support_chat::config::ConfigError>(())
//! ```

mod ai;
mod app;
mod capture;
mod error;

pub use ai::AiConfig;
pub use app::{AppSettings, Environment};
pub use capture::CaptureConfig;
pub use error::{ConfigError, ValidationError};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Process settings (environment, log level)
    #[serde(default)]
    pub app: AppSettings,

    /// Completion backend configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Contact persistence configuration
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SUPPORT_CHAT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `SUPPORT_CHAT__AI__API_KEY=gsk_...` -> `ai.api_key = gsk_...`
    /// - `SUPPORT_CHAT__CAPTURE__CSV_PATH=...` -> `capture.csv_path = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SUPPORT_CHAT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a missing API key, an out-of-range
    /// timeout, an unregistered default model or an empty CSV path.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.capture.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.app.is_production()
    }
}
