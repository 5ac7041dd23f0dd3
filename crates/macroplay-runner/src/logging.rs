use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use macroplay_core::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for a component.
///
/// - `component_name`: Name of the component (e.g., "cli")
/// - `config`: file logging switch, directory and retention
///
/// Console output goes to stderr. Returns a guard that must be kept alive for
/// the duration of the program when file logging is enabled.
pub fn init_logging(component_name: &str, config: &LoggingConfig) -> io::Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if !config.file {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    }

    let log_dir = config.log_dir();
    fs::create_dir_all(&log_dir)?;

    // Make room for the new file
    let prune_errors = prune_logs(&log_dir, component_name, config.keep.saturating_sub(1));

    let log_path = log_dir.join(log_file_name(component_name, Local::now()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).with_ansi(true))
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!("Logging to file: {}", log_path.display());
    for (path, err) in prune_errors {
        tracing::warn!("Failed to remove old log file {}: {}", path.display(), err);
    }

    Ok(Some(guard))
}

/// `<component>_<dd-mm-YYYY_HH-MM-SS>.log`
pub fn log_file_name(component_name: &str, now: DateTime<Local>) -> String {
    format!("{}_{}.log", component_name, now.format("%d-%m-%Y_%H-%M-%S"))
}

/// Delete the oldest log files of a component until at most `keep` remain
///
/// Returns the files that could not be removed.
pub fn prune_logs(log_dir: &Path, component_name: &str, keep: usize) -> Vec<(PathBuf, io::Error)> {
    let mut failures = Vec::new();
    let mut logs = match component_logs(log_dir, component_name) {
        Ok(logs) => logs,
        Err(err) => {
            failures.push((log_dir.to_path_buf(), err));
            return failures;
        }
    };

    // Oldest first
    logs.sort();
    let excess = logs.len().saturating_sub(keep);
    for (_, path) in logs.into_iter().take(excess) {
        if let Err(err) = fs::remove_file(&path) {
            failures.push((path, err));
        }
    }
    failures
}

fn component_logs(
    log_dir: &Path,
    component_name: &str,
) -> io::Result<Vec<(std::time::SystemTime, PathBuf)>> {
    let prefix = format!("{}_", component_name);
    let mut logs = Vec::new();
    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with(&prefix) && name.ends_with(".log")) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        logs.push((modified, entry.path()));
    }
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_log_file_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(log_file_name("cli", now), "cli_07-03-2024_09-05-02.log");
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "cli_a.log", 400);
        touch(dir.path(), "cli_b.log", 300);
        touch(dir.path(), "cli_c.log", 200);
        touch(dir.path(), "cli_d.log", 100);
        touch(dir.path(), "other_a.log", 900);
        touch(dir.path(), "cli_notes.txt", 900);

        let failures = prune_logs(dir.path(), "cli", 2);
        assert!(failures.is_empty());

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec!["cli_c.log", "cli_d.log", "cli_notes.txt", "other_a.log"]
        );
    }

    #[test]
    fn test_prune_with_keep_zero_removes_all() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "cli_a.log", 10);
        assert!(prune_logs(dir.path(), "cli", 0).is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_prune_missing_dir_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let failures = prune_logs(&dir.path().join("missing"), "cli", 1);
        assert_eq!(failures.len(), 1);
    }
}
