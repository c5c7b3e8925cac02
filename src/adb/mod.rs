//! Device session management over adb.
//!
//! Three layers, lowest first:
//!
//! - [`process`] — spawn the adb binary with a bounded timeout, capture and
//!   classify the outcome.
//! - [`target`] — the single mutable piece of state: which device the panel
//!   currently talks to.
//! - [`commands`] — argument templates for connect / devices / keyevent /
//!   reboot / screencap, always addressed to the live target.

pub mod commands;
pub mod process;
pub mod target;

pub use commands::{AdbControl, CaptureError};
pub use process::{AdbInvoker, AdbOutput, Bridge, InvokeError, InvokeFailure};
pub use target::{DeviceTarget, TargetError};
