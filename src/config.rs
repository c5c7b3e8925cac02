//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Environment variables** — `TV_IP`, `TVCTL_LISTEN`, `TVCTL_ADB_PATH`
//! 2. **Config file** — path via `--config <path>`, or `tvctl.toml` in CWD
//! 3. **Compiled defaults** — see each field's default value below
//!
//! The TOML file mirrors the struct hierarchy:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8000"
//!
//! [bridge]
//! adb_path = "adb"
//! port = 5555
//! command_timeout_secs = 15
//! screenshot_timeout_secs = 10
//!
//! [device]
//! default_host = "10.0.110.253"
//!
//! [reconnect]
//! interval_secs = 5
//! settle_secs = 2
//!
//! [stream]
//! frame_delay_ms = 180
//! retry_delay_ms = 400
//! capture_timeout_secs = 6
//!
//! [logging]
//! level = "info"
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (default `0.0.0.0:8000`).
    #[serde(default = "default_listen")]
    pub listen: String,
}

/// adb binary and invocation deadlines.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// adb binary, resolved via `PATH` unless absolute (default `adb`).
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// TCP port appended to the device host (default 5555).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline for connect / devices / keyevent / reboot (default 15 s).
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Deadline for the one-shot `GET /screenshot` capture (default 10 s).
    #[serde(default = "default_screenshot_timeout_secs")]
    pub screenshot_timeout_secs: u64,
}

/// Which device the panel talks to until retargeted via `POST /set_ip`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Initial device host. Override with `TV_IP`.
    #[serde(default = "default_host")]
    pub default_host: String,
}

/// Auto-reconnect supervisor timing.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Seconds between device-list polls (default 5).
    #[serde(default = "default_reconnect_interval_secs")]
    pub interval_secs: u64,
    /// Extra settle wait after issuing a connect (default 2).
    #[serde(default = "default_reconnect_settle_secs")]
    pub settle_secs: u64,
}

/// Frame-stream pacing for `GET /screen`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Wait after a delivered frame before the next capture (default 180 ms).
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
    /// Backoff after a failed or empty capture (default 400 ms).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Deadline for each per-frame capture (default 6 s).
    #[serde(default = "default_stream_capture_timeout_secs")]
    pub capture_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level (default `info`). Overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_adb_path() -> String {
    "adb".to_string()
}
fn default_port() -> u16 {
    5555
}
fn default_command_timeout_secs() -> u64 {
    15
}
fn default_screenshot_timeout_secs() -> u64 {
    10
}
fn default_host() -> String {
    "10.0.110.253".to_string()
}
fn default_reconnect_interval_secs() -> u64 {
    5
}
fn default_reconnect_settle_secs() -> u64 {
    2
}
fn default_frame_delay_ms() -> u64 {
    180
}
fn default_retry_delay_ms() -> u64 {
    400
}
fn default_stream_capture_timeout_secs() -> u64 {
    6
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            port: default_port(),
            command_timeout_secs: default_command_timeout_secs(),
            screenshot_timeout_secs: default_screenshot_timeout_secs(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            default_host: default_host(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconnect_interval_secs(),
            settle_secs: default_reconnect_settle_secs(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_delay_ms: default_frame_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            capture_timeout_secs: default_stream_capture_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl BridgeConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn screenshot_timeout(&self) -> Duration {
        Duration::from_secs(self.screenshot_timeout_secs)
    }
}

impl StreamConfig {
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }
}

impl Config {
    /// Load configuration with the precedence chain: env vars > file > defaults.
    ///
    /// If `path` is `Some`, reads that file (panics on failure). Otherwise
    /// looks for `tvctl.toml` in the current directory, falling back to
    /// compiled defaults.
    pub fn load(path: Option<&str>) -> Self {
        let mut config: Config = if let Some(p) = path {
            let content = std::fs::read_to_string(p)
                .unwrap_or_else(|e| panic!("Failed to read config file {p}: {e}"));
            toml::from_str(&content)
                .unwrap_or_else(|e| panic!("Failed to parse config file {p}: {e}"))
        } else if Path::new("tvctl.toml").exists() {
            let content =
                std::fs::read_to_string("tvctl.toml").expect("Failed to read tvctl.toml");
            toml::from_str(&content).expect("Failed to parse tvctl.toml")
        } else {
            Config {
                server: ServerConfig::default(),
                bridge: BridgeConfig::default(),
                device: DeviceConfig::default(),
                reconnect: ReconnectConfig::default(),
                stream: StreamConfig::default(),
                logging: LoggingConfig::default(),
            }
        };

        // Env var overrides
        if let Ok(ip) = std::env::var("TV_IP") {
            config.device.default_host = ip;
        }
        if let Ok(listen) = std::env::var("TVCTL_LISTEN") {
            config.server.listen = listen;
        }
        if let Ok(adb) = std::env::var("TVCTL_ADB_PATH") {
            config.bridge.adb_path = adb;
        }

        config
    }
}
