//! Unauthenticated health-check endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /api/health` — liveness probe.
///
/// Returns status, uptime, version, and the current device target. Suitable
/// for load-balancer health checks.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "adb_device": state.adb.target().serial(),
    }))
}
