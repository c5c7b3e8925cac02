#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # tvctl
//!
//! Web control panel for Android TV devices over adb.
//!
//! tvctl exposes a small HTTP API (plus an embedded single-page panel) that
//! lets anyone on the local network remote-control a TV: retarget the device
//! address, connect, send key events, reboot, and watch a best-effort live
//! view. A background supervisor keeps the adb connection alive.
//!
//! ## API surface
//!
//! | Method | Path          | Description                                  |
//! |--------|---------------|----------------------------------------------|
//! | GET    | `/`           | Embedded control panel                       |
//! | GET    | `/api/health` | Liveness probe                               |
//! | POST   | `/set_ip`     | Retarget the panel to another TV             |
//! | GET    | `/connect`    | One `adb connect` attempt                    |
//! | GET    | `/status`     | Raw `adb devices` listing + current target   |
//! | POST   | `/key`        | Inject one remote-control key event          |
//! | POST   | `/reboot`     | Reboot the device                            |
//! | GET    | `/screenshot` | One PNG still                                |
//! | GET    | `/screen`     | Infinite multipart PNG frame stream          |
//!
//! ## Architecture
//!
//! ```text
//! main.rs         — entry point, clap CLI, router setup, graceful shutdown
//! config.rs       — TOML + env-var configuration
//! state.rs        — shared AppState
//! reconnect.rs    — auto-reconnect supervisor (periodic devices/connect loop)
//! adb/
//!   process.rs    — adb invocation with timeout, output capture, failure classes
//!   target.rs     — current device target (the one piece of mutable state)
//!   commands.rs   — argument templates: connect, devices, keyevent, reboot, screencap
//! routes/
//!   ui.rs         — GET /
//!   health.rs     — GET /api/health
//!   control.rs    — set_ip, connect, status, key, reboot
//!   screen.rs     — screenshot + per-connection frame stream
//! ```

mod adb;
mod config;
mod reconnect;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use adb::{AdbControl, AdbInvoker, DeviceTarget};
use config::Config;
use state::AppState;

/// Web control panel for Android TV devices over adb.
#[derive(Parser)]
#[command(name = "tvctl", version)]
struct Cli {
    /// Path to TOML config file.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    // Initialize tracing
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    info!("tvctl v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Initial device target: {}:{}",
        config.device.default_host, config.bridge.port
    );
    info!("Listening on {}", config.server.listen);

    let target = Arc::new(DeviceTarget::new(
        config.device.default_host.clone(),
        config.bridge.port,
    ));
    let control = AdbControl::new(
        AdbInvoker::new(config.bridge.adb_path.clone()),
        target,
        config.bridge.command_timeout(),
    );

    let state = AppState {
        config: Arc::new(config),
        start_time: Instant::now(),
        adb: Arc::new(control.clone()),
    };

    // Local-network panel: any origin may call the API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(routes::ui::index))
        .route("/api/health", get(routes::health::health))
        .route("/set_ip", post(routes::control::set_ip))
        .route("/connect", get(routes::control::connect))
        .route("/status", get(routes::control::status))
        .route("/key", post(routes::control::key))
        .route("/reboot", post(routes::control::reboot))
        .route("/screenshot", get(routes::screen::screenshot))
        .route("/screen", get(routes::screen::screen))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let listener = TcpListener::bind(&state.config.server.listen)
        .await
        .expect("Failed to bind");

    // Auto-reconnect supervisor: runs for the process lifetime, aborted at
    // shutdown.
    let reconnect_task = tokio::spawn(reconnect::run(
        control,
        state.config.reconnect.clone(),
    ));

    info!("Server ready");

    // Graceful shutdown
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM");
            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("Received SIGINT");
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("Server error");

    info!("Shutting down...");
    reconnect_task.abort();
    info!("Goodbye");
}
