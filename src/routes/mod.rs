//! HTTP route handlers.
//!
//! Each sub-module corresponds to an endpoint group. Bridge-invocation
//! failures are reported in the 200 response body (`out`/`err`/`code`) so the
//! panel can show raw adb diagnostics; only malformed requests get a 4xx.

pub mod control;
pub mod health;
pub mod screen;
pub mod ui;
