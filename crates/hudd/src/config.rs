//! Relay configuration.
//!
//! Resolved in layers, each overriding the previous:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, else `<config_dir>/hornet-hud/config.toml` if present)
//! 3. environment variables (`HORNET_PID`, `HORNET_PIDFILE`, `HUD_*`)
//! 4. command-line flags (applied by the binary)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use hud_core::{WorkerPid, DEFAULT_REPLAY_CAPACITY};

use crate::discovery::{DEFAULT_PID_REFRESH, DEFAULT_PROCESS_MARKER};
use crate::hub::{HubConfig, DEFAULT_SUBSCRIBER_QUEUE};
use crate::ingest::{StreamIngestConfig, DEFAULT_RECONNECT_DELAY};

/// Default upstream stream address.
pub const DEFAULT_STREAM_ADDR: &str = "127.0.0.1:8650";
/// Default metrics datagram bind address.
pub const DEFAULT_METRICS_ADDR: &str = "127.0.0.1:9999";
/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8645";
/// Default static asset directory.
pub const DEFAULT_STATIC_DIR: &str = "./static";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Complete relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Upstream `host:port` of the worker's newline-delimited feed.
    pub stream_addr: String,

    /// Local `host:port` for metrics datagrams.
    pub metrics_addr: String,

    /// Local `host:port` for the HTTP server.
    pub http_addr: String,

    /// Explicit worker PID. Disables scanning.
    pub pid: Option<WorkerPid>,

    /// File holding the worker PID. Disables scanning when readable.
    pub pidfile: Option<PathBuf>,

    /// Substring matched against process names and command lines.
    pub process_marker: String,

    /// Directory holding the dashboard page and its assets.
    pub static_dir: PathBuf,

    /// Console/reliable frames kept for replay.
    pub replay_capacity: usize,

    /// Per-subscriber queue bound.
    pub subscriber_queue: usize,

    /// Wait before reconnecting to the upstream feed, in milliseconds.
    pub reconnect_delay_ms: u64,

    /// Interval between process scans, in seconds.
    pub pid_refresh_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            stream_addr: DEFAULT_STREAM_ADDR.to_string(),
            metrics_addr: DEFAULT_METRICS_ADDR.to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            pid: None,
            pidfile: None,
            process_marker: DEFAULT_PROCESS_MARKER.to_string(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
            reconnect_delay_ms: duration_millis(DEFAULT_RECONNECT_DELAY),
            pid_refresh_secs: DEFAULT_PID_REFRESH.as_secs(),
        }
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl RelayConfig {
    /// Parse configuration from a TOML string. Missing keys keep defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for invalid TOML, unknown keys, or
    /// out-of-range PIDs.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hornet-hud").join("config.toml"))
    }

    /// Loads defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.is_file() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// An unparseable `HORNET_PID` is ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(raw) = get("HORNET_PID") {
            match raw.parse::<WorkerPid>() {
                Ok(pid) => self.pid = Some(pid),
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid HORNET_PID"),
            }
        }
        if let Some(path) = get("HORNET_PIDFILE") {
            self.pidfile = Some(PathBuf::from(path));
        }
        if let Some(addr) = get("HUD_STREAM_ADDR") {
            self.stream_addr = addr;
        }
        if let Some(addr) = get("HUD_METRICS_ADDR") {
            self.metrics_addr = addr;
        }
        if let Some(addr) = get("HUD_HTTP_ADDR") {
            self.http_addr = addr;
        }
        if let Some(dir) = get("HUD_STATIC_DIR") {
            self.static_dir = PathBuf::from(dir);
        }
        if let Some(marker) = get("HUD_PROCESS_MARKER") {
            self.process_marker = marker;
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, addr) in [
            ("stream_addr", &self.stream_addr),
            ("metrics_addr", &self.metrics_addr),
            ("http_addr", &self.http_addr),
        ] {
            if addr.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
        }
        if self.process_marker.trim().is_empty() {
            return Err(ConfigError::Validation(
                "process_marker must not be empty".to_string(),
            ));
        }
        if self.replay_capacity == 0 {
            return Err(ConfigError::Validation(
                "replay_capacity must be at least 1".to_string(),
            ));
        }
        if self.subscriber_queue <= self.replay_capacity + 1 {
            return Err(ConfigError::Validation(format!(
                "subscriber_queue ({}) must exceed replay_capacity + 1 ({})",
                self.subscriber_queue,
                self.replay_capacity + 1
            )));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "reconnect_delay_ms must be at least 1".to_string(),
            ));
        }
        if self.pid_refresh_secs == 0 {
            return Err(ConfigError::Validation(
                "pid_refresh_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Hub sizing.
    pub fn hub(&self) -> HubConfig {
        HubConfig {
            replay_capacity: self.replay_capacity,
            subscriber_queue: self.subscriber_queue,
        }
    }

    /// Stream ingestion settings.
    pub fn stream_ingest(&self) -> StreamIngestConfig {
        StreamIngestConfig {
            reconnect_delay: self.reconnect_delay(),
            ..StreamIngestConfig::new(self.stream_addr.clone())
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn pid_refresh(&self) -> Duration {
        Duration::from_secs(self.pid_refresh_secs)
    }
}
