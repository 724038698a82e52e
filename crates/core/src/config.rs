//! Workflow settings shared by the server and store (persisted as `tallyback.toml`).

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validate::DEFAULT_MAX_TEXT_LEN;

/// Canonical config file name looked up in the data directory.
pub const CONFIG_FILE_NAME: &str = "tallyback.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TallybackConfig {
    #[serde(default)]
    pub review: ReviewSettings,
    #[serde(default)]
    pub clarification: ClarificationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewSettings {
    /// Days a review link stays open after issue.
    #[serde(default = "default_review_window_days")]
    pub window_days: i64,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            window_days: default_review_window_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClarificationSettings {
    /// Days a clarification link stays open; `0` issues links that never expire.
    #[serde(default = "default_clarification_window_days")]
    pub window_days: i64,
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for ClarificationSettings {
    fn default() -> Self {
        Self {
            window_days: default_clarification_window_days(),
            max_message_len: default_max_message_len(),
        }
    }
}

fn default_review_window_days() -> i64 {
    7
}
fn default_clarification_window_days() -> i64 {
    14
}
fn default_max_message_len() -> usize {
    DEFAULT_MAX_TEXT_LEN
}

impl TallybackConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Reject settings no link could be issued with.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.review.window_days < 1 {
            return Err(ConfigError::Invalid(
                "review.window_days must be at least 1".to_string(),
            ));
        }
        if self.clarification.window_days < 0 {
            return Err(ConfigError::Invalid(
                "clarification.window_days must not be negative".to_string(),
            ));
        }
        if self.clarification.max_message_len == 0 {
            return Err(ConfigError::Invalid(
                "clarification.max_message_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl ReviewSettings {
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + Duration::days(self.window_days)
    }
}

impl ClarificationSettings {
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (self.window_days > 0).then(|| issued_at + Duration::days(self.window_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::at;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = TallybackConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, TallybackConfig::default());
        assert_eq!(cfg.review.window_days, 7);
        assert_eq!(cfg.clarification.max_message_len, DEFAULT_MAX_TEXT_LEN);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = TallybackConfig::from_toml_str(
            r#"
[clarification]
window_days = 0
"#,
        )
        .unwrap();
        assert_eq!(cfg.review.window_days, 7);
        assert_eq!(cfg.clarification.window_days, 0);
        assert_eq!(cfg.clarification.expires_at(at("2024-01-01T00:00:00Z")), None);
    }

    #[test]
    fn invalid_windows_are_rejected() {
        let err = TallybackConfig::from_toml_str("[review]\nwindow_days = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = TallybackConfig::from_toml_str("[review]\nwindow_days = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_default_and_present_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert_eq!(TallybackConfig::load(&path).unwrap(), TallybackConfig::default());

        std::fs::write(&path, "[review]\nwindow_days = 3\n").unwrap();
        let cfg = TallybackConfig::load(&path).unwrap();
        assert_eq!(
            cfg.review.expires_at(at("2024-01-08T00:00:00Z")),
            at("2024-01-11T00:00:00Z")
        );
    }
}
