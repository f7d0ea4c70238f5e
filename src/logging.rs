//! Subscriber setup for the binary: console output plus a daily log file.
//!
//! Library modules only emit `tracing` events. Installing the subscriber is
//! the caller's job and happens once, in `main`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};

pub const LOG_NAME: &str = "network_health";

/// Filter for the log file: this crate at debug, dependencies at info.
pub const FILE_LOG_DIRECTIVES: &str = "info,network_health=debug";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Returns the log file path when file
/// logging is active.
pub fn init(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console: BoxedLayer = match config.format {
        LogFormat::Json => fmt::layer().json().with_filter(filter).boxed(),
        LogFormat::Text => fmt::layer().with_filter(filter).boxed(),
    };
    let mut layers = vec![console];

    let mut file_error = None;
    let mut log_path = None;
    if config.file_enabled {
        match open_daily_log(config.directory.as_deref()) {
            Ok((path, file)) => {
                layers.push(file_layer(file));
                log_path = Some(path);
            }
            Err(e) => file_error = Some(e),
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(e) = file_error {
        tracing::warn!(error = %e, "file logging disabled, logging to console only");
    }
    if let Some(path) = &log_path {
        tracing::debug!(path = %path.display(), "writing log file");
    }
    Ok(log_path)
}

fn file_layer(file: File) -> BoxedLayer {
    fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(EnvFilter::new(FILE_LOG_DIRECTIVES))
        .boxed()
}

/// Directories tried for the log file, most preferred first.
pub fn log_directories(configured: Option<&Path>) -> Vec<PathBuf> {
    if let Some(dir) = configured {
        return vec![dir.to_path_buf()];
    }
    let mut candidates = vec![PathBuf::from("/var/log").join(LOG_NAME)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".logs").join(LOG_NAME));
    }
    candidates
}

/// Open (append) `<dir>/<YYYY-MM-DD>.log` in the first usable directory.
pub fn open_daily_log(configured: Option<&Path>) -> Result<(PathBuf, File)> {
    let file_name = format!("{}.log", chrono::Utc::now().format("%Y-%m-%d"));
    let mut last_err = None;

    for dir in log_directories(configured) {
        match open_in(&dir, &file_name) {
            Ok(file) => return Ok((dir.join(&file_name), file)),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no log directory candidates")))
}

fn open_in(dir: &Path, file_name: &str) -> Result<File> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;
    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_directory_is_only_candidate() {
        let dirs = log_directories(Some(Path::new("/tmp/nh-logs")));
        assert_eq!(dirs, vec![PathBuf::from("/tmp/nh-logs")]);
    }

    #[test]
    fn test_system_directory_preferred() {
        let dirs = log_directories(None);
        assert_eq!(dirs[0], PathBuf::from("/var/log/network_health"));
    }

    #[test]
    fn test_file_layer_keeps_crate_debug_and_drops_dependency_debug() {
        let log = tempfile::NamedTempFile::new().unwrap();
        let subscriber = tracing_subscriber::registry().with(file_layer(log.reopen().unwrap()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "network_health::runner", "process output captured");
            tracing::debug!(target: "hyper::proto::h1", "parsed response headers");
            tracing::info!(target: "reqwest::connect", "connection established");
        });

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("process output captured"));
        assert!(written.contains("connection established"));
        assert!(!written.contains("parsed response headers"));
    }

    #[test]
    fn test_open_daily_log_creates_dated_file() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested");
        let (path, _file) = open_daily_log(Some(&target)).unwrap();

        assert!(path.exists());
        assert!(path.starts_with(&target));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "YYYY-MM-DD.log".len());
    }
}
