//! Configuration structures.
//!
//! Configuration is loaded from a `KEY=VALUE` file (default `config.ini`) and
//! then overridden by command-line flags. Every value has a default, so a
//! missing file or a bad entry never prevents the server from starting.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::errors::{Error, Result};

/// Fallback listen backlog.
pub const DEFAULT_BACKLOG: u32 = 1;
/// Fallback admission limit.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1;

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Listener and connection handling.
    #[serde(default)]
    pub server: ServerConfig,

    /// Keypad/alarm peripheral.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Static files for the admin console.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// TCP bind address.
    pub listen_addr: String,

    /// Pending connections the kernel may queue while all worker slots are busy.
    pub backlog: u32,

    /// Maximum concurrently active client workers. The accept loop is
    /// suspended while this many workers are running.
    pub max_connections: usize,

    /// Upper bound on a single request (headers + body).
    pub max_request_bytes: usize,

    /// Deadline in seconds for receiving a whole request.
    pub read_timeout_secs: u64,

    /// Write timeout in seconds per response.
    pub write_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            backlog: DEFAULT_BACKLOG,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_request_bytes: 4096,
            read_timeout_secs: 10,
            write_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| Error::config(format!("invalid listen address {:?}: {}", self.listen_addr, e)))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

/// Peripheral configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Character device exposed by the alarm driver.
    pub path: PathBuf,

    /// Wait before retrying after a failed read, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/my_alarm"),
            retry_backoff_ms: 1000,
        }
    }
}

impl DeviceConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Admin console asset location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory containing `webserver.html` and `favicon.ico`.
    pub web_root: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            web_root: PathBuf::from("web"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load from a `KEY=VALUE` file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Self::from_kv_str(&contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse the contents of a `KEY=VALUE` file.
    ///
    /// Unknown keys are ignored. Numeric values that do not parse, or are not
    /// positive, keep their default.
    pub fn from_kv_str(contents: &str) -> Self {
        let mut config = Self::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "BACKLOG" => {
                    config.server.backlog = positive(key, value, DEFAULT_BACKLOG);
                }
                "MAX_CONNECTIONS" => {
                    config.server.max_connections = positive(key, value, DEFAULT_MAX_CONNECTIONS);
                }
                "MAX_REQUEST_BYTES" => {
                    let fallback = config.server.max_request_bytes;
                    config.server.max_request_bytes = positive(key, value, fallback);
                }
                "READ_TIMEOUT_SECS" => {
                    let fallback = config.server.read_timeout_secs;
                    config.server.read_timeout_secs = positive(key, value, fallback);
                }
                "WRITE_TIMEOUT_SECS" => {
                    let fallback = config.server.write_timeout_secs;
                    config.server.write_timeout_secs = positive(key, value, fallback);
                }
                "RETRY_BACKOFF_MS" => {
                    let fallback = config.device.retry_backoff_ms;
                    config.device.retry_backoff_ms = positive(key, value, fallback);
                }
                "LISTEN_ADDR" => config.server.listen_addr = value.to_string(),
                "DEVICE_PATH" => config.device.path = PathBuf::from(value),
                "WEB_ROOT" => config.assets.web_root = PathBuf::from(value),
                "LOG_LEVEL" => config.observability.log_level = value.to_string(),
                "LOG_FORMAT" => config.observability.json_logs = value.eq_ignore_ascii_case("json"),
                _ => tracing::debug!("Ignoring unknown config key {}", key),
            }
        }

        config
    }
}

fn positive<T>(key: &str, value: &str, fallback: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    match value.parse::<T>() {
        Ok(n) if n > T::default() => n,
        _ => {
            tracing::warn!("Invalid {}={:?}, using default {}", key, value, fallback);
            fallback
        }
    }
}
