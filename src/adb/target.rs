//! Current device target, shared by request handlers and both supervisors.
//!
//! The target is the only mutable state in the process. Replacement is
//! whole-value and atomic with respect to readers, and every operation reads
//! the live value at call time — retargeting mid-flight redirects a running
//! supervisor within one iteration.

use std::sync::{PoisonError, RwLock};

/// Host plus fixed adb TCP port, rendered as the `"host:port"` serial that
/// adb's `-s` selector expects.
#[derive(Debug)]
pub struct DeviceTarget {
    host: RwLock<String>,
    port: u16,
}

/// Rejections from [`DeviceTarget::set_host`].
#[derive(Debug, PartialEq, Eq)]
pub enum TargetError {
    /// The submitted host was empty or whitespace.
    EmptyHost,
}

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetError::EmptyHost => write!(f, "device host must not be empty"),
        }
    }
}

impl DeviceTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: RwLock::new(host.into()),
            port,
        }
    }

    /// Current host address.
    pub fn host(&self) -> String {
        self.host
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current `"host:port"` serial string.
    pub fn serial(&self) -> String {
        format!("{}:{}", self.host(), self.port)
    }

    /// Replace the target host. The previous value stays in place when the
    /// new one is rejected.
    pub fn set_host(&self, host: &str) -> Result<String, TargetError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(TargetError::EmptyHost);
        }
        *self.host.write().unwrap_or_else(PoisonError::into_inner) = host.to_string();
        Ok(self.serial())
    }
}
