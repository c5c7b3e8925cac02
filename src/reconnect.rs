//! Auto-reconnect supervisor.
//!
//! A single long-lived task, spawned at startup and aborted at shutdown.
//! Every cycle it lists the devices the adb daemon knows about and, when the
//! configured target serial is absent from the listing, issues a connect.
//! The target is re-read on every cycle, so retargeting via `POST /set_ip`
//! redirects the supervisor within one polling interval.
//!
//! Invocation failures are logged and swallowed — a TV that is off for an
//! hour must not kill the loop. Programming errors still propagate: nothing
//! here catches panics.

use std::time::Duration;

use tracing::{debug, warn};

use crate::adb::{AdbControl, Bridge};
use crate::config::ReconnectConfig;

/// Run the supervisor loop. Never returns; cancel by aborting the task.
pub async fn run<B: Bridge>(control: AdbControl<B>, config: ReconnectConfig) {
    let interval = Duration::from_secs(config.interval_secs);
    let settle = Duration::from_secs(config.settle_secs);
    loop {
        cycle(&control, settle).await;
        tokio::time::sleep(interval).await;
    }
}

/// One check → connect-if-absent cycle.
async fn cycle<B: Bridge>(control: &AdbControl<B>, settle: Duration) {
    let serial = control.target().serial();
    let listing = control.devices().await;
    if let Some(kind) = listing.failure {
        warn!("device listing failed ({kind:?}): {}", listing.stderr.trim());
    }
    if listing.stdout.contains(&serial) {
        debug!("{serial} present in device list");
        return;
    }

    let out = control.connect().await;
    if out.success() {
        debug!("connect {serial}: {}", out.stdout.trim());
    } else {
        warn!(
            "connect {serial} failed (code {}): {}",
            out.exit_code,
            out.stderr.trim()
        );
    }
    // Give the adb daemon a moment before the next listing
    tokio::time::sleep(settle).await;
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::adb::{AdbOutput, DeviceTarget, InvokeError};

    /// Scripted bridge: records every argument list and answers `devices`
    /// with a fixed listing, everything else with a timeout.
    #[derive(Clone)]
    struct ScriptedBridge {
        devices_stdout: Arc<Mutex<String>>,
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl ScriptedBridge {
        fn new(devices_stdout: &str) -> Self {
            Self {
                devices_stdout: Arc::new(Mutex::new(devices_stdout.to_string())),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        fn connect_attempts(&self) -> usize {
            self.calls()
                .iter()
                .filter(|args| args.first().map(String::as_str) == Some("connect"))
                .count()
        }
    }

    impl Bridge for ScriptedBridge {
        fn invoke(
            &self,
            args: Vec<String>,
            _timeout: Duration,
        ) -> impl Future<Output = AdbOutput> + Send {
            self.calls.lock().unwrap().push(args.clone());
            let devices = self.devices_stdout.lock().unwrap().clone();
            async move {
                if args.first().map(String::as_str) == Some("devices") {
                    AdbOutput {
                        stdout: devices,
                        stderr: String::new(),
                        exit_code: 0,
                        failure: None,
                    }
                } else {
                    AdbOutput::timed_out()
                }
            }
        }

        fn invoke_raw(
            &self,
            _args: Vec<String>,
            _timeout: Duration,
        ) -> impl Future<Output = Result<Vec<u8>, InvokeError>> + Send {
            async { Err(InvokeError::Timeout) }
        }
    }

    fn control(bridge: ScriptedBridge, host: &str) -> AdbControl<ScriptedBridge> {
        AdbControl::new(
            bridge,
            Arc::new(DeviceTarget::new(host, 5555)),
            Duration::from_secs(15),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn present_device_skips_connect() {
        let bridge = ScriptedBridge::new(
            "List of devices attached\n10.0.110.253:5555\tdevice\n",
        );
        let control = control(bridge.clone(), "10.0.110.253");
        cycle(&control, Duration::from_secs(2)).await;
        assert_eq!(bridge.connect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn absent_device_triggers_connect_with_live_serial() {
        let bridge = ScriptedBridge::new("List of devices attached\n");
        let control = control(bridge.clone(), "10.0.110.253");
        cycle(&control, Duration::from_secs(2)).await;

        control.target().set_host("192.168.0.5").unwrap();
        cycle(&control, Duration::from_secs(2)).await;

        let connects: Vec<Vec<String>> = bridge
            .calls()
            .into_iter()
            .filter(|a| a.first().map(String::as_str) == Some("connect"))
            .collect();
        assert_eq!(connects.len(), 2);
        assert_eq!(connects[0][1], "10.0.110.253:5555");
        assert_eq!(connects[1][1], "192.168.0.5:5555");
    }

    #[tokio::test(start_paused = true)]
    async fn loop_survives_an_always_timing_out_bridge() {
        // `devices` answers, but every connect attempt times out. The loop
        // must keep cycling anyway.
        let bridge = ScriptedBridge::new("List of devices attached\n");
        let control = control(bridge.clone(), "10.0.110.253");

        let handle = tokio::spawn(run(
            control,
            ReconnectConfig {
                interval_secs: 5,
                settle_secs: 2,
            },
        ));

        // Cycles land at t=0, t=7, t=14, ...
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(bridge.connect_attempts() >= 4);
        assert!(!handle.is_finished());
        handle.abort();
    }
}
