//! Command façade over the adb invoker.
//!
//! Each operation formats a fixed argument template, substitutes the live
//! [`DeviceTarget`] serial at call time, and delegates to the [`Bridge`].
//! No retries here — retry policy belongs to the callers (the reconnect
//! supervisor retries by looping, the frame stream by backing off).

use std::sync::Arc;
use std::time::Duration;

use super::process::{Bridge, InvokeError};
use super::target::DeviceTarget;
use super::AdbOutput;

/// Errors from [`AdbControl::screencap`].
#[derive(Debug)]
pub enum CaptureError {
    /// The screencap invocation exceeded its deadline.
    Timeout,
    /// The screencap invocation could not run at all.
    Failed(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Timeout => write!(f, "screencap timed out"),
            CaptureError::Failed(e) => write!(f, "screencap failed: {e}"),
        }
    }
}

/// Device control operations, shared by request handlers and supervisors.
///
/// Generic over [`Bridge`] so the supervisor loops can be exercised against
/// scripted invokers in tests.
#[derive(Debug, Clone)]
pub struct AdbControl<B> {
    bridge: B,
    target: Arc<DeviceTarget>,
    command_timeout: Duration,
}

impl<B: Bridge> AdbControl<B> {
    pub fn new(bridge: B, target: Arc<DeviceTarget>, command_timeout: Duration) -> Self {
        Self {
            bridge,
            target,
            command_timeout,
        }
    }

    pub fn target(&self) -> &DeviceTarget {
        &self.target
    }

    /// `adb connect <serial>` — ask the adb daemon to attach the device.
    pub async fn connect(&self) -> AdbOutput {
        let args = connect_args(&self.target.serial());
        self.bridge.invoke(args, self.command_timeout).await
    }

    /// `adb devices` — list devices known to the adb daemon.
    pub async fn devices(&self) -> AdbOutput {
        self.bridge
            .invoke(devices_args(), self.command_timeout)
            .await
    }

    /// `adb -s <serial> shell input keyevent <code>` — inject one key press.
    pub async fn send_key(&self, code: i64) -> AdbOutput {
        let args = key_args(&self.target.serial(), code);
        self.bridge.invoke(args, self.command_timeout).await
    }

    /// `adb -s <serial> reboot`.
    pub async fn reboot(&self) -> AdbOutput {
        let args = reboot_args(&self.target.serial());
        self.bridge.invoke(args, self.command_timeout).await
    }

    /// `adb -s <serial> exec-out screencap -p` — grab one PNG still.
    ///
    /// The timeout is per call site: the one-shot screenshot route allows
    /// more than the stream's per-frame grab.
    pub async fn screencap(&self, timeout: Duration) -> Result<Vec<u8>, CaptureError> {
        let args = screencap_args(&self.target.serial());
        match self.bridge.invoke_raw(args, timeout).await {
            Ok(data) => Ok(data),
            Err(InvokeError::Timeout) => Err(CaptureError::Timeout),
            Err(e) => Err(CaptureError::Failed(e.to_string())),
        }
    }
}

fn connect_args(serial: &str) -> Vec<String> {
    vec!["connect".to_string(), serial.to_string()]
}

fn devices_args() -> Vec<String> {
    vec!["devices".to_string()]
}

fn key_args(serial: &str, code: i64) -> Vec<String> {
    vec![
        "-s".to_string(),
        serial.to_string(),
        "shell".to_string(),
        "input".to_string(),
        "keyevent".to_string(),
        code.to_string(),
    ]
}

fn reboot_args(serial: &str) -> Vec<String> {
    vec!["-s".to_string(), serial.to_string(), "reboot".to_string()]
}

fn screencap_args(serial: &str) -> Vec<String> {
    vec![
        "-s".to_string(),
        serial.to_string(),
        "exec-out".to_string(),
        "screencap".to_string(),
        "-p".to_string(),
    ]
}
