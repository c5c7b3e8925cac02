//! Shared application state passed to every handler via Axum's `State` extractor.

use std::sync::Arc;
use std::time::Instant;

use crate::adb::{AdbControl, AdbInvoker};
use crate::config::Config;

/// Shared application state for the tvctl server.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration loaded at startup.
    pub config: Arc<Config>,
    /// Monotonic instant when the server started (for uptime calculation).
    pub start_time: Instant,
    /// Device control façade: live target plus the adb invoker. The reconnect
    /// supervisor holds its own clone of the same façade.
    pub adb: Arc<AdbControl<AdbInvoker>>,
}
