use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{logging_config::LoggingConfig, paths::ProjectPaths, player_config::PlayerConfig};

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Config file not found")]
    NotFound,
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("IO error reading config: {0}")]
    IoError(String),
}

/// Commented example written by `init-config`
pub const EXAMPLE_CONFIG: &str = r#"# macroplay configuration

[player]
# Delay before an action resumes after a render finished
render_resume_delay_ms = 100
# Driver loop cadence
tick_interval_ms = 50
# Deepest allowed nesting of loop bodies
max_nesting_depth = 64

[logging]
# Also write logs to <data_dir>/logs
file = true
# Number of log files kept
keep = 5
"#;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroplayConfig {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MacroplayConfig {
    pub fn config_path() -> PathBuf {
        ProjectPaths::macroplay()
            .map(|p| p.config_dir())
            .unwrap_or_else(|| PathBuf::from(".macroplay"))
            .join("config.toml")
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound);
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        let config =
            toml::from_str(&content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))?;
        info!(target: "config", "Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write [`EXAMPLE_CONFIG`] to `path` unless a file already exists there
    ///
    /// Returns whether the file was written.
    pub fn write_example(path: &Path) -> std::io::Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, EXAMPLE_CONFIG)?;
        info!(target: "config", "Wrote example config to {}", path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = MacroplayConfig::load_from(&dir.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigLoadError::NotFound));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[player]\ntick_interval_ms = 10\n").unwrap();

        let config = MacroplayConfig::load_from(&path).unwrap();
        assert_eq!(config.player.tick_interval_ms, 10);
        assert_eq!(config.player.render_resume_delay_ms, 100);
        assert_eq!(config.player.max_nesting_depth, 64);
        assert!(config.logging.file);
        assert_eq!(config.logging.keep, 5);
    }

    #[test]
    fn test_example_matches_defaults() {
        let config: MacroplayConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, MacroplayConfig::default());
    }

    #[test]
    fn test_write_example_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(MacroplayConfig::write_example(&path).unwrap());
        fs::write(&path, "[player]\nmax_nesting_depth = 3\n").unwrap();
        assert!(!MacroplayConfig::write_example(&path).unwrap());

        let config = MacroplayConfig::load_from(&path).unwrap();
        assert_eq!(config.player.max_nesting_depth, 3);
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[player\n").unwrap();
        assert!(matches!(
            MacroplayConfig::load_from(&path),
            Err(ConfigLoadError::ParseError(_))
        ));
    }
}
