//! Tracing setup.
//!
//! Stdout belongs to the headless NDJSON stream and to the terminal UI, so logs
//! always go to a file.

use anyhow::{Context, Result};
use std::fs::{OpenOptions, create_dir_all};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::EnvFilter;

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Filter used when neither `RUST_LOG` nor `LOG_LEVEL` is set.
pub const DEFAULT_FILTER: &str = "info,citadel=debug";

/// Log file used when `LOG_FILE` is unset.
pub const DEFAULT_LOG_FILE: &str = "citadel.log";

/// Maps a `LOG_LEVEL` value to a filter directive.
pub fn level_directive(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Some("off"),
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}

fn filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| level_directive(&level))
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber writing to `LOG_FILE` (default `citadel.log`).
///
/// Calling it again is a no-op.
pub fn init_logging() -> Result<()> {
    let path = std::env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    init_logging_to(path)
}

/// Installs the global subscriber writing to `path`, truncating it once.
///
/// Later calls leave both the subscriber and the file untouched.
pub fn init_logging_to(path: impl AsRef<Path>) -> Result<()> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Ok(());
    }

    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    LOGGING_INITIALIZED.set(()).ok();

    tracing::info!(log_file = %path.display(), "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("DEBUG"), Some("debug"));
        assert_eq!(level_directive(" warning "), Some("warn"));
        assert_eq!(level_directive("loud"), None);
    }

    #[test]
    fn test_second_init_keeps_the_log() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("citadel.log");
        init_logging_to(&path).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "earlier entry").unwrap();
        drop(file);

        init_logging_to(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("earlier entry"));
    }
}
