//! Low-level adb invocation and output capture.
//!
//! Every interaction with the device ultimately goes through [`AdbInvoker`]:
//! one child process per call, output captured with a hard timeout, and
//! `kill_on_drop(true)` so a cancelled caller never leaks the child.
//!
//! Invocation-level failures are classified into [`InvokeFailure`] and
//! reported **in-band** as an [`AdbOutput`] with a sentinel exit code, the
//! same way the adb CLI itself reports device errors on stderr. Callers that
//! need raw bytes (screen capture) use [`AdbInvoker::invoke_raw`], which
//! returns a `Result` instead.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Max captured bytes per stream for [`AdbInvoker::invoke`] (1 MB).
///
/// Output beyond this limit is still drained from the pipe (to prevent
/// deadlocks) but discarded.
const MAX_OUTPUT: usize = 1024 * 1024;

/// Sentinel exit code for a timed-out invocation, matching `timeout(1)`.
const EXIT_TIMEOUT: i32 = 124;

/// Sentinel exit code for a missing adb binary, matching shell convention.
const EXIT_NOT_FOUND: i32 = 127;

/// Result of one adb invocation.
///
/// Always produced, even on failure — the sentinel `exit_code` and
/// [`failure`](Self::failure) kind let callers (and the HTTP layer) surface
/// raw diagnostics instead of masking them behind an error response.
#[derive(Debug, Clone)]
pub struct AdbOutput {
    /// Captured stdout, lossy UTF-8 decoded.
    pub stdout: String,
    /// Captured stderr, lossy UTF-8 decoded.
    pub stderr: String,
    /// Real exit code, or a sentinel (124 timeout, 127 not found, -1 wait error).
    pub exit_code: i32,
    /// Set when the invocation itself failed, as opposed to adb running and
    /// exiting nonzero.
    pub failure: Option<InvokeFailure>,
}

/// Invocation-level failure kinds. Nonzero exits are *not* failures at this
/// layer — adb ran and said something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeFailure {
    /// The adb binary could not be spawned.
    NotFound,
    /// The child outlived its deadline and was killed.
    Timeout,
}

impl AdbOutput {
    pub fn timed_out() -> Self {
        Self {
            stdout: String::new(),
            stderr: "timeout".to_string(),
            exit_code: EXIT_TIMEOUT,
            failure: Some(InvokeFailure::Timeout),
        }
    }

    pub fn not_found(detail: String) -> Self {
        Self {
            stdout: String::new(),
            stderr: detail,
            exit_code: EXIT_NOT_FOUND,
            failure: Some(InvokeFailure::NotFound),
        }
    }

    /// True when adb ran to completion and exited zero.
    pub fn success(&self) -> bool {
        self.failure.is_none() && self.exit_code == 0
    }
}

/// Errors from [`AdbInvoker::invoke_raw`].
#[derive(Debug)]
pub enum InvokeError {
    /// The adb binary could not be started (not found, permission denied).
    SpawnFailed(String),
    /// The child started but reading or waiting on it failed.
    ProcessFailed(String),
    /// The invocation exceeded its timeout and was killed.
    Timeout,
}

impl std::fmt::Display for InvokeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvokeError::SpawnFailed(e) => write!(f, "failed to spawn adb: {e}"),
            InvokeError::ProcessFailed(e) => write!(f, "adb process error: {e}"),
            InvokeError::Timeout => write!(f, "adb invocation timed out"),
        }
    }
}

/// Seam between the command façade and the real adb binary.
///
/// Production code uses [`AdbInvoker`]; supervisor tests substitute scripted
/// implementations.
pub trait Bridge: Send + Sync {
    /// Run adb with `args`, capturing text output. Never fails out-of-band.
    fn invoke(&self, args: Vec<String>, timeout: Duration)
        -> impl Future<Output = AdbOutput> + Send;

    /// Run adb with `args`, capturing raw stdout bytes.
    fn invoke_raw(
        &self,
        args: Vec<String>,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, InvokeError>> + Send;
}

/// Spawns the external adb binary. The path is configurable so deployments
/// can point at a platform-tools install that is not on `PATH` (and tests at
/// a stub).
#[derive(Debug, Clone)]
pub struct AdbInvoker {
    adb_path: String,
}

impl AdbInvoker {
    pub fn new(adb_path: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    async fn run(&self, args: Vec<String>, timeout: Duration) -> AdbOutput {
        let mut cmd = Command::new(&self.adb_path);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return AdbOutput::not_found("adb-not-found".to_string());
            }
            Err(e) => return AdbOutput::not_found(e.to_string()),
        };

        let Some(mut stdout) = child.stdout.take() else {
            return wait_error("missing stdout pipe".to_string());
        };
        let Some(mut stderr) = child.stderr.take() else {
            return wait_error("missing stderr pipe".to_string());
        };

        let capture = async {
            // Read both pipes concurrently to avoid pipe deadlock
            let (out, err) = tokio::join!(
                read_capped(&mut stdout, MAX_OUTPUT),
                read_capped(&mut stderr, MAX_OUTPUT),
            );
            drop(stdout);
            drop(stderr);

            match child.wait().await {
                Ok(status) => AdbOutput {
                    stdout: String::from_utf8_lossy(&out).into_owned(),
                    stderr: String::from_utf8_lossy(&err).into_owned(),
                    exit_code: status.code().unwrap_or(-1),
                    failure: None,
                },
                Err(e) => wait_error(e.to_string()),
            }
        };

        // On timeout the capture future is dropped, and kill_on_drop reaps
        // the child.
        match tokio::time::timeout(timeout, capture).await {
            Ok(output) => output,
            Err(_) => AdbOutput::timed_out(),
        }
    }

    async fn run_raw(&self, args: Vec<String>, timeout: Duration) -> Result<Vec<u8>, InvokeError> {
        let mut cmd = Command::new(&self.adb_path);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| InvokeError::SpawnFailed(e.to_string()))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| InvokeError::ProcessFailed("missing stdout pipe".to_string()))?;

        let capture = async {
            let mut data = Vec::new();
            stdout
                .read_to_end(&mut data)
                .await
                .map_err(|e| InvokeError::ProcessFailed(e.to_string()))?;
            drop(stdout);
            child
                .wait()
                .await
                .map_err(|e| InvokeError::ProcessFailed(e.to_string()))?;
            Ok(data)
        };

        match tokio::time::timeout(timeout, capture).await {
            Ok(result) => result,
            Err(_) => Err(InvokeError::Timeout),
        }
    }
}

impl Bridge for AdbInvoker {
    fn invoke(
        &self,
        args: Vec<String>,
        timeout: Duration,
    ) -> impl Future<Output = AdbOutput> + Send {
        self.run(args, timeout)
    }

    fn invoke_raw(
        &self,
        args: Vec<String>,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, InvokeError>> + Send {
        self.run_raw(args, timeout)
    }
}

fn wait_error(detail: String) -> AdbOutput {
    AdbOutput {
        stdout: String::new(),
        stderr: detail,
        exit_code: -1,
        failure: None,
    }
}

/// Read from an async reader, keeping the first `max_bytes` and discarding
/// the rest. Keeps draining past the cap — closing a pipe while the child is
/// still writing causes SIGPIPE and potential deadlocks.
async fn read_capped(reader: &mut (impl tokio::io::AsyncRead + Unpin), max_bytes: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(max_bytes.min(65536));
    let mut tmp = [0u8; 8192];
    loop {
        match reader.read(&mut tmp).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if buf.len() < max_bytes {
                    let take = n.min(max_bytes - buf.len());
                    buf.extend_from_slice(&tmp[..take]);
                }
            }
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_classified_as_not_found() {
        let invoker = AdbInvoker::new("/definitely/not/a/real/adb");
        let out = invoker
            .invoke(vec!["devices".to_string()], Duration::from_secs(1))
            .await;
        assert_eq!(out.failure, Some(InvokeFailure::NotFound));
        assert_eq!(out.exit_code, 127);
        assert!(out.stdout.is_empty());
    }

    #[tokio::test]
    async fn overrunning_child_classified_as_timeout() {
        let invoker = AdbInvoker::new("sleep");
        let out = invoker
            .invoke(vec!["5".to_string()], Duration::from_millis(100))
            .await;
        assert_eq!(out.failure, Some(InvokeFailure::Timeout));
        assert_eq!(out.exit_code, 124);
        assert_eq!(out.stderr, "timeout");
    }

    #[tokio::test]
    async fn normal_exit_carries_real_output_and_code() {
        let invoker = AdbInvoker::new("sh");
        let out = invoker
            .invoke(
                vec![
                    "-c".to_string(),
                    "echo listed; echo warn >&2; exit 3".to_string(),
                ],
                Duration::from_secs(5),
            )
            .await;
        assert_eq!(out.failure, None);
        assert_eq!(out.stdout, "listed\n");
        assert_eq!(out.stderr, "warn\n");
        assert_eq!(out.exit_code, 3);
        assert!(!out.success());
    }

    #[tokio::test]
    async fn raw_invocation_returns_exact_bytes() {
        let invoker = AdbInvoker::new("sh");
        let data = invoker
            .invoke_raw(
                vec!["-c".to_string(), "printf 'PNG-bytes'".to_string()],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(data, b"PNG-bytes");
    }

    #[tokio::test]
    async fn raw_invocation_times_out() {
        let invoker = AdbInvoker::new("sleep");
        let err = invoker
            .invoke_raw(vec!["5".to_string()], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Timeout));
    }
}
