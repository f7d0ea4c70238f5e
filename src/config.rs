//! TOML configuration for network-health.
//!
//! Every field has a default, so an absent or partial file is valid. The file
//! is looked up at an explicit path, then `NETWORK_HEALTH_CONFIG`, then
//! `/etc/network-health/network-health.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CONFIG_ENV_VAR: &str = "NETWORK_HEALTH_CONFIG";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/network-health/network-health.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkHealthConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ping: PingConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkHealthConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the configuration file.
    ///
    /// An explicit path must load. Environment and system locations fall back
    /// to defaults when unreadable; each fallback is described in the returned
    /// warnings, to be logged once a subscriber is installed.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Vec<String>)> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::discover_in(explicit, env_path.as_deref(), Path::new(SYSTEM_CONFIG_PATH))
    }

    fn discover_in(
        explicit: Option<&Path>,
        env_path: Option<&Path>,
        system_path: &Path,
    ) -> Result<(Self, Vec<String>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Vec::new()));
        }

        let mut warnings = Vec::new();
        if let Some(path) = env_path {
            match Self::load(path) {
                Ok(cfg) => return Ok((cfg, warnings)),
                Err(e) => warnings.push(format!(
                    "{}={} could not be loaded, trying fallback: {:#}",
                    CONFIG_ENV_VAR,
                    path.display(),
                    e
                )),
            }
        }

        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok((cfg, warnings)),
                Err(e) => warnings.push(format!(
                    "system config {} could not be loaded, using defaults: {:#}",
                    system_path.display(),
                    e
                )),
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok((Self::default(), warnings))
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Metrics intake endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; `/v1/validate` and `/v2/series` are appended.
    pub base_url: String,
    /// Header carrying the API key.
    pub api_key_header: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Host name attached to data points. Defaults to the machine hostname.
    pub host: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.datadoghq.com/api".to_string(),
            api_key_header: "DD-API-KEY".to_string(),
            timeout_secs: 30,
            host: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Ping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    pub packet_count: u32,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            packet_count: crate::probes::ping::DEFAULT_PACKET_COUNT,
        }
    }
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// External tool execution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Kill a tool that runs longer than this. `0` disables the limit.
    pub timeout_secs: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self { timeout_secs: 600 }
    }
}

impl ProcessConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Console output format.
    pub format: LogFormat,
    /// Write a daily log file in addition to the console.
    pub file_enabled: bool,
    /// Log file directory. Unset means the system directory with a home
    /// directory fallback.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file_enabled: true,
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = NetworkHealthConfig::default();
        assert_eq!(cfg.backend.base_url, "https://api.datadoghq.com/api");
        assert_eq!(cfg.backend.api_key_header, "DD-API-KEY");
        assert_eq!(cfg.ping.packet_count, 100);
        assert_eq!(cfg.process.timeout(), Some(Duration::from_secs(600)));
        assert_eq!(cfg.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[backend]
base_url = "https://api.datadoghq.eu/api"
host = "edge-probe-7"

[process]
timeout_secs = 0
"#
        )
        .unwrap();

        let cfg = NetworkHealthConfig::load(file.path()).unwrap();
        assert_eq!(cfg.backend.base_url, "https://api.datadoghq.eu/api");
        assert_eq!(cfg.backend.host.as_deref(), Some("edge-probe-7"));
        assert_eq!(cfg.backend.api_key_header, "DD-API-KEY");
        assert_eq!(cfg.process.timeout(), None);
        assert_eq!(cfg.ping.packet_count, 100);
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let err = NetworkHealthConfig::discover(Some(Path::new("/nonexistent/nh.toml")));
        assert!(err.is_err());
    }

    #[test]
    fn test_unreadable_env_path_falls_back_with_warning() {
        let (cfg, warnings) = NetworkHealthConfig::discover_in(
            None,
            Some(Path::new("/nonexistent/nh.toml")),
            Path::new("/nonexistent/system.toml"),
        )
        .unwrap();

        assert_eq!(cfg.backend.api_key_header, "DD-API-KEY");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("NETWORK_HEALTH_CONFIG=/nonexistent/nh.toml"));
        assert!(warnings[0].contains("could not be loaded"));
    }

    #[test]
    fn test_malformed_system_file_falls_back_with_warning() {
        let mut system = tempfile::NamedTempFile::new().unwrap();
        writeln!(system, "[backend\nbase_url = ").unwrap();

        let (cfg, warnings) =
            NetworkHealthConfig::discover_in(None, None, system.path()).unwrap();

        assert_eq!(cfg.backend.base_url, "https://api.datadoghq.com/api");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("system config"));
        assert!(warnings[0].contains("failed to parse config file"));
    }

    #[test]
    fn test_env_path_wins_over_system_file() {
        let mut env_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(env_file, "[ping]\npacket_count = 7").unwrap();

        let (cfg, warnings) = NetworkHealthConfig::discover_in(
            None,
            Some(env_file.path()),
            Path::new("/nonexistent/system.toml"),
        )
        .unwrap();

        assert_eq!(cfg.ping.packet_count, 7);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ping]\npacket_count = \"many\"").unwrap();
        assert!(NetworkHealthConfig::load(file.path()).is_err());
    }
}
