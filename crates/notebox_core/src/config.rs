//! Engine configuration.
//!
//! # Responsibility
//! - Describe where the database, managed images and logs live.
//! - Load that description from JSON provided by the host.
//!
//! # Invariants
//! - `image_dir` and, when set, `log_dir` are absolute paths after `validate()`.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::path::PathBuf;

/// Paths and logging options supplied by the hosting environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Flat directory owned by the image store.
    pub image_dir: PathBuf,
    /// `trace|debug|info|warn|error`; build-mode default when absent.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Rolling log directory; logging stays off when absent.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new(database_path: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            image_dir: image_dir.into(),
            log_level: None,
            log_dir: None,
        }
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| format!("invalid engine config: {err}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.image_dir.is_absolute() {
            return Err(format!(
                "image_dir must be an absolute path, got `{}`",
                self.image_dir.display()
            ));
        }
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(format!(
                    "log_dir must be an absolute path, got `{}`",
                    log_dir.display()
                ));
            }
        }
        Ok(())
    }

    /// Configured level, or the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use std::path::Path;

    #[test]
    fn parses_minimal_json() {
        let config = EngineConfig::from_json_str(
            r#"{"database_path": "/data/notes.db", "image_dir": "/data/images"}"#,
        )
        .unwrap();
        assert_eq!(config.image_dir, Path::new("/data/images"));
        assert!(config.log_dir.is_none());
        assert!(!config.effective_log_level().is_empty());
    }

    #[test]
    fn rejects_relative_image_dir() {
        let err = EngineConfig::from_json_str(
            r#"{"database_path": "notes.db", "image_dir": "images"}"#,
        )
        .unwrap_err();
        assert!(err.contains("image_dir"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = EngineConfig::from_json_str(
            r#"{"database_path": "/n.db", "image_dir": "/i", "sync": true}"#,
        )
        .unwrap_err();
        assert!(err.contains("invalid engine config"));
    }

    #[test]
    fn explicit_log_level_wins() {
        let mut config = EngineConfig::new("/n.db", "/i");
        config.log_level = Some("warn".to_string());
        assert_eq!(config.effective_log_level(), "warn");
    }
}
