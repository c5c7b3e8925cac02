//! Device control endpoints.
//!
//! - `POST /set_ip`  — retarget the panel to another TV
//! - `GET  /connect` — ask the adb daemon to attach the target
//! - `GET  /status`  — raw `adb devices` listing plus the current target
//! - `POST /key`     — inject one remote-control key event
//! - `POST /reboot`  — reboot the device
//!
//! Command responses carry adb's raw stdout/stderr/exit code verbatim, even
//! when the invocation failed — the panel log shows the user exactly what
//! adb said instead of a masked HTTP error.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::adb::AdbOutput;
use crate::state::AppState;

/// Request body for `POST /set_ip`.
#[derive(Deserialize)]
pub struct SetIpRequest {
    /// New device host address.
    pub ip: String,
}

/// Response body for `POST /set_ip`.
#[derive(Serialize)]
pub struct SetIpResponse {
    pub tv_ip: String,
    pub adb_device: String,
}

/// Request body for `POST /key`. Non-integer `key` values are rejected by the
/// extractor before the handler runs.
#[derive(Deserialize)]
pub struct KeyRequest {
    /// Android keyevent code (e.g. 3 = Home, 26 = Power, 66 = Enter).
    pub key: i64,
}

/// One adb invocation, as the panel sees it.
#[derive(Serialize)]
pub struct CommandResponse {
    pub out: String,
    pub err: String,
    pub code: i32,
}

impl From<AdbOutput> for CommandResponse {
    fn from(out: AdbOutput) -> Self {
        Self {
            out: out.stdout,
            err: out.stderr,
            code: out.exit_code,
        }
    }
}

/// Response body for `GET /status`.
#[derive(Serialize)]
pub struct StatusResponse {
    pub adb_devices: String,
    pub adb_err: String,
    pub adb_device: String,
}

/// `POST /set_ip` — replace the device target for all subsequent operations,
/// including the already-running supervisors.
///
/// # Errors
///
/// - `400 Bad Request` with `{"code":"INVALID_IP"}` — empty host
pub async fn set_ip(
    State(state): State<AppState>,
    Json(payload): Json<SetIpRequest>,
) -> Result<Json<SetIpResponse>, (StatusCode, Json<Value>)> {
    match state.adb.target().set_host(&payload.ip) {
        Ok(serial) => {
            info!("device target set to {serial}");
            Ok(Json(SetIpResponse {
                tv_ip: state.adb.target().host(),
                adb_device: serial,
            }))
        }
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": e.to_string(), "code": "INVALID_IP"})),
        )),
    }
}

/// `GET /connect` — one connect attempt against the current target.
pub async fn connect(State(state): State<AppState>) -> Json<CommandResponse> {
    let out = state.adb.connect().await;
    Json(CommandResponse {
        out: out.stdout.trim().to_string(),
        err: out.stderr.trim().to_string(),
        code: out.exit_code,
    })
}

/// `GET /status` — raw device listing and the current target serial.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let out = state.adb.devices().await;
    Json(StatusResponse {
        adb_devices: out.stdout,
        adb_err: out.stderr,
        adb_device: state.adb.target().serial(),
    })
}

/// `POST /key` — send one keyevent to the current target.
pub async fn key(
    State(state): State<AppState>,
    Json(payload): Json<KeyRequest>,
) -> Json<CommandResponse> {
    Json(state.adb.send_key(payload.key).await.into())
}

/// `POST /reboot` — reboot the current target.
pub async fn reboot(State(state): State<AppState>) -> Json<CommandResponse> {
    Json(state.adb.reboot().await.into())
}
