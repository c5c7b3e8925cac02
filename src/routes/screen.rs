//! Screen capture endpoints.
//!
//! - `GET /screenshot` — one PNG still
//! - `GET /screen`     — infinite `multipart/x-mixed-replace` frame stream
//!
//! Each `/screen` connection gets its own capture loop; there is no shared
//! frame cache. A failed or empty capture is a transient condition: the loop
//! backs off briefly and tries again, and the stream only ends when the
//! client goes away. Axum drops the body stream on disconnect, which cancels
//! the in-flight capture, and `kill_on_drop` on the child reaps the screencap
//! process.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::Stream;
use tracing::debug;

use crate::adb::CaptureError;
use crate::state::AppState;

/// Part delimiter, kept in sync with the `boundary=` response header.
const FRAME_BOUNDARY: &str = "--frame";

/// `GET /screenshot` — capture and return a single PNG.
///
/// # Errors
///
/// - `504 Gateway Timeout` — screencap exceeded `bridge.screenshot_timeout_secs`
/// - `500 Internal Server Error` — screencap could not run
pub async fn screenshot(State(state): State<AppState>) -> Response {
    match state
        .adb
        .screencap(state.config.bridge.screenshot_timeout())
        .await
    {
        Ok(data) => ([(header::CONTENT_TYPE, "image/png")], data).into_response(),
        Err(e @ CaptureError::Timeout) => {
            (StatusCode::GATEWAY_TIMEOUT, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// `GET /screen` — continuously-replacing PNG frame stream.
pub async fn screen(State(state): State<AppState>) -> Response {
    let adb = state.adb.clone();
    let capture_timeout = state.config.stream.capture_timeout();
    let stream = frame_stream(
        move || {
            let adb = adb.clone();
            async move { adb.screencap(capture_timeout).await }
        },
        state.config.stream.frame_delay(),
        state.config.stream.retry_delay(),
    );

    (
        [(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=--frame",
        )],
        Body::from_stream(stream),
    )
        .into_response()
}

/// The per-connection capture loop, as a lazy infinite stream.
///
/// Emits one framed chunk per successful capture, then waits `frame_delay`
/// before the next grab. Failures and empty captures emit nothing and retry
/// after `retry_delay`. At most one capture is in flight at a time, and the
/// loop stops as soon as the stream is dropped.
fn frame_stream<C, Fut>(
    capture: C,
    frame_delay: Duration,
    retry_delay: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<u8>, CaptureError>>,
{
    futures::stream::unfold((capture, false), move |(mut capture, delivered)| async move {
        if delivered {
            tokio::time::sleep(frame_delay).await;
        }
        loop {
            match capture().await {
                Ok(data) if !data.is_empty() => {
                    return Some((Ok(frame_chunk(&data)), (capture, true)));
                }
                Ok(_) => debug!("empty screen capture, retrying"),
                Err(e) => debug!("screen capture failed: {e}"),
            }
            tokio::time::sleep(retry_delay).await;
        }
    })
}

/// Wrap one PNG into a multipart part: boundary line, content headers, image
/// bytes, trailing CRLF.
fn frame_chunk(data: &[u8]) -> Bytes {
    let head = format!(
        "{FRAME_BOUNDARY}\r\nContent-Type: image/png\r\nContent-Length: {}\r\n\r\n",
        data.len()
    );
    let mut buf = Vec::with_capacity(head.len() + data.len() + 2);
    buf.extend_from_slice(head.as_bytes());
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
    Bytes::from(buf)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures::StreamExt;

    use super::*;

    #[test]
    fn frame_chunk_wraps_bytes_with_headers() {
        let chunk = frame_chunk(b"12345");
        assert_eq!(
            &chunk[..],
            b"--frame\r\nContent-Type: image/png\r\nContent-Length: 5\r\n\r\n12345\r\n" as &[u8]
        );
    }

    /// Capture source that replays a script, then fails forever.
    fn scripted_capture(
        script: Vec<Result<Vec<u8>, CaptureError>>,
    ) -> impl FnMut() -> std::pin::Pin<
        Box<dyn Future<Output = Result<Vec<u8>, CaptureError>> + Send>,
    > {
        let script = Arc::new(Mutex::new(VecDeque::from(script)));
        move || {
            let script = script.clone();
            Box::pin(async move {
                script
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Err(CaptureError::Failed("script drained".to_string())))
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_skipped_without_ending_the_stream() {
        let capture = scripted_capture(vec![
            Err(CaptureError::Failed("screen off".to_string())),
            Ok(b"one".to_vec()),
            Err(CaptureError::Timeout),
            Ok(b"two".to_vec()),
        ]);
        let mut stream = Box::pin(frame_stream(
            capture,
            Duration::from_millis(180),
            Duration::from_millis(400),
        ));

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, frame_chunk(b"one"));
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second, frame_chunk(b"two"));

        // The script is drained and every further capture fails; the stream
        // keeps retrying instead of terminating.
        let pending = tokio::time::timeout(Duration::from_secs(5), stream.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_captures_are_skipped() {
        let capture = scripted_capture(vec![Ok(Vec::new()), Ok(b"frame".to_vec())]);
        let mut stream = Box::pin(frame_stream(
            capture,
            Duration::from_millis(180),
            Duration::from_millis(400),
        ));
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, frame_chunk(b"frame"));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_consumer_stops_captures() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let capture = move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(b"frame".to_vec())
            }
        };
        let mut stream = Box::pin(frame_stream(
            capture,
            Duration::from_millis(180),
            Duration::from_millis(400),
        ));

        stream.next().await;
        let captures_while_open = count.load(Ordering::SeqCst);
        drop(stream);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), captures_while_open);
    }
}
