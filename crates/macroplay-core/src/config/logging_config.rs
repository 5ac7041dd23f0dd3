use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::ProjectPaths;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether log output is also written to a file
    #[serde(default = "default_file")]
    pub file: bool,

    /// Directory receiving log files (default: <data_dir>/logs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Number of log files kept, the current one included
    #[serde(default = "default_keep")]
    pub keep: usize,
}

fn default_file() -> bool {
    true
}

fn default_keep() -> usize {
    5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_file(),
            dir: None,
            keep: default_keep(),
        }
    }
}

impl LoggingConfig {
    /// Get the log directory path (use provided or default)
    pub fn log_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            ProjectPaths::macroplay()
                .map(|p| p.log_dir())
                .unwrap_or_else(|| PathBuf::from(".macroplay/logs"))
        })
    }
}
