//! Contact capture persistence configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Where captured contacts are written
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// CSV file receiving `timestamp,name,email` rows
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
}

impl CaptureConfig {
    pub fn csv_path(&self) -> PathBuf {
        PathBuf::from(&self.csv_path)
    }

    /// Validate capture configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.csv_path.trim().is_empty() {
            return Err(ValidationError::EmptyCsvPath);
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
        }
    }
}

fn default_csv_path() -> String {
    "user_data.csv".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.csv_path(), PathBuf::from("user_data.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_path_rejected() {
        let config = CaptureConfig {
            csv_path: "  ".to_string(),
        };
        assert_eq!(config.validate(), Err(ValidationError::EmptyCsvPath));
    }
}
