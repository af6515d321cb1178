// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE relay between the orchestrator and the client connection.
//!
//! Wire format, exactly:
//!
//! ```text
//! event: message
//! data: {"content":"..."}
//!
//! data: [DONE]
//! ```
//!
//! The relay never buffers beyond one delta (channel capacity 1) and
//! flushes every frame as it is produced. Dropping the response stream
//! (client disconnect) fires the cancellation token through the embedded
//! drop guard, which cancels the upstream within one chunk.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::header::{HeaderName, HeaderValue, CACHE_CONTROL, CONNECTION};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

/// One frame from the orchestrator to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayFrame {
    /// Visible content delta.
    Content(String),
    /// Mid-stream failure, reported in-band.
    Error(String),
    /// Terminal marker; the stream ends after this.
    Done,
}

/// JSON payload for a content frame.
pub fn content_payload(text: &str) -> String {
    serde_json::json!({ "content": text }).to_string()
}

/// JSON payload for an in-band error frame.
pub fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": true, "message": message }).to_string()
}

impl RelayFrame {
    fn into_event(self) -> Event {
        match self {
            RelayFrame::Content(text) => Event::default()
                .event("message")
                .data(content_payload(&text)),
            RelayFrame::Error(message) => Event::default()
                .event("message")
                .data(error_payload(&message)),
            RelayFrame::Done => Event::default().data("[DONE]"),
        }
    }
}

/// Relay channel capacity: the relay holds at most one delta.
pub const RELAY_BUFFER: usize = 1;

/// Stream of SSE events that cancels the completion when dropped.
struct RelayStream {
    rx: mpsc::Receiver<RelayFrame>,
    done_sent: bool,
    _guard: DropGuard,
}

impl Stream for RelayStream {
    type Item = Result<Event, std::convert::Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done_sent {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(frame)) => {
                if frame == RelayFrame::Done {
                    self.done_sent = true;
                }
                Poll::Ready(Some(Ok(frame.into_event())))
            }
            // Sender dropped without Done (orchestrator panicked): end.
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Builds the SSE response around a relay channel.
///
/// `guard` must wrap the completion's cancellation token so a client
/// disconnect propagates to the orchestrator and upstream.
pub fn sse_response(rx: mpsc::Receiver<RelayFrame>, guard: DropGuard) -> Response {
    let stream = RelayStream {
        rx,
        done_sent: false,
        _guard: guard,
    };

    // No keep-alive comment frames: the wire carries exclusively
    // `event: message` frames and the final `data: [DONE]`.
    let mut response = Sse::new(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    // Disable proxy buffering so frames reach the client immediately.
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn content_payload_is_the_wire_contract() {
        assert_eq!(content_payload("Hi"), r#"{"content":"Hi"}"#);
    }

    #[test]
    fn error_payload_carries_flag_and_message() {
        let payload = error_payload("upstream lost");
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["error"], true);
        assert_eq!(value["message"], "upstream lost");
    }

    #[tokio::test]
    async fn relay_stream_ends_after_done() {
        // Wider buffer than production so the test can enqueue up front.
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let mut stream = RelayStream {
            rx,
            done_sent: false,
            _guard: cancel.clone().drop_guard(),
        };

        tx.send(RelayFrame::Content("a".to_string())).await.unwrap();
        tx.send(RelayFrame::Done).await.unwrap();
        // A late frame after Done must never be delivered.
        tx.send(RelayFrame::Content("late".to_string())).await.unwrap();
        drop(tx);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some(), "Done event is delivered");
        assert!(stream.next().await.is_none(), "stream ends after Done");
    }

    #[tokio::test]
    async fn dropping_the_relay_cancels_the_completion() {
        let (_tx, rx) = mpsc::channel(RELAY_BUFFER);
        let cancel = CancellationToken::new();
        let stream = RelayStream {
            rx,
            done_sent: false,
            _guard: cancel.clone().drop_guard(),
        };

        assert!(!cancel.is_cancelled());
        drop(stream);
        assert!(cancel.is_cancelled(), "client disconnect fires the token");
    }

    #[tokio::test]
    async fn relay_ends_when_sender_vanishes_without_done() {
        let (tx, rx) = mpsc::channel(RELAY_BUFFER);
        let cancel = CancellationToken::new();
        let mut stream = RelayStream {
            rx,
            done_sent: false,
            _guard: cancel.drop_guard(),
        };
        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
