use std::fs;
use std::path::{Path, PathBuf};

use macroplay_core::ActionLibrary;
use macroplay_host::SceneState;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an action library from a JSON file
pub fn load_library(path: &Path) -> Result<ActionLibrary, LoadError> {
    let library: ActionLibrary =
        serde_json::from_str(&read(path)?).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        target: "config",
        "Loaded {} global and {} local actions from {}",
        library.global_actions.len(),
        library.local_actions.len(),
        path.display()
    );
    Ok(library)
}

/// Write an action library as pretty-printed JSON
pub fn save_library(library: &ActionLibrary, path: &Path) -> Result<(), LoadError> {
    let io_error = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let content = serde_json::to_string_pretty(library).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, content).map_err(io_error)?;
    info!(target: "config", "Saved action library to {}", path.display());
    Ok(())
}

/// Load an in-memory scene description from a JSON file
pub fn load_scene(path: &Path) -> Result<SceneState, LoadError> {
    let scene = serde_json::from_str(&read(path)?).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(target: "config", "Loaded scene from {}", path.display());
    Ok(scene)
}
