use std::path::PathBuf;

/// Per-platform application directories
///
/// On macOS and Linux the XDG base directories are used:
/// - Config: $XDG_CONFIG_HOME/{name} (default: ~/.config/{name})
/// - Data: $XDG_DATA_HOME/{name} (default: ~/.local/share/{name})
///
/// On Windows both resolve below %APPDATA%\{name}.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    name: String,
}

impl ProjectPaths {
    /// Returns `None` when no home directory can be determined.
    pub fn new(name: &str) -> Option<Self> {
        home_dir()?;
        Some(ProjectPaths {
            name: name.to_string(),
        })
    }

    /// Paths for the `macroplay` application
    pub fn macroplay() -> Option<Self> {
        Self::new("macroplay")
    }

    pub fn config_dir(&self) -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            windows_appdata()
                .map(|p| p.join(&self.name))
                .unwrap_or_else(|| PathBuf::from(format!(".{}", self.name)))
        }

        #[cfg(not(target_os = "windows"))]
        {
            xdg_dir("XDG_CONFIG_HOME", &[".config"], &self.name)
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            windows_appdata()
                .map(|p| p.join(&self.name))
                .unwrap_or_else(|| PathBuf::from(format!(".{}", self.name)))
        }

        #[cfg(not(target_os = "windows"))]
        {
            xdg_dir("XDG_DATA_HOME", &[".local", "share"], &self.name)
        }
    }

    /// Directory receiving log files
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

/// Resolve `$var/{name}`, falling back to `~/<fallback...>/{name}`
#[cfg(not(target_os = "windows"))]
fn xdg_dir(var: &str, fallback: &[&str], name: &str) -> PathBuf {
    let relative: PathBuf = fallback.iter().collect();
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir().map(|h| h.join(&relative)))
        .unwrap_or(relative)
        .join(name)
}

#[cfg(target_os = "windows")]
fn windows_appdata() -> Option<PathBuf> {
    std::env::var("APPDATA").ok().map(PathBuf::from)
}
