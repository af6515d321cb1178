// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for upstream completion responses.
//!
//! Converts a reqwest response byte stream into a lazy sequence of
//! [`Delta`] values using the `eventsource-stream` crate: `data: ` lines
//! carry one JSON object each, incomplete trailing bytes are buffered
//! until the next network read, and a literal `data: [DONE]` line ends
//! the sequence.

use eventsource_stream::Eventsource;
use futures::stream::StreamExt;
use tokio_util::sync::CancellationToken;

use solace_core::types::Delta;
use solace_core::{DeltaStream, SolaceError};

/// Internal frame classification for one SSE event.
enum Frame {
    Delta(Delta),
    Done,
    Skip,
}

/// Parses a streaming response into a [`DeltaStream`].
///
/// The stream is finite (ends at `[DONE]`) and non-restartable. When
/// `cancel` fires, delivery stops within one network-buffer quantum and
/// dropping the stream releases the pooled connection.
pub fn parse_delta_stream(response: reqwest::Response, cancel: CancellationToken) -> DeltaStream {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream
        .map(|result| match result {
            Ok(event) => {
                let data = event.data.trim();
                if data.is_empty() {
                    return Ok(Frame::Skip);
                }
                if data == "[DONE]" {
                    return Ok(Frame::Done);
                }
                serde_json::from_str::<Delta>(data)
                    .map(Frame::Delta)
                    .map_err(|e| {
                        SolaceError::UpstreamProtocol(format!("malformed delta frame: {e}"))
                    })
            }
            Err(e) => Err(SolaceError::UpstreamProtocol(format!("SSE framing: {e}"))),
        })
        .take_while(|item| {
            let done = matches!(item, Ok(Frame::Done));
            futures::future::ready(!done)
        })
        .filter_map(|item| async move {
            match item {
                Ok(Frame::Delta(delta)) => Some(Ok(delta)),
                Ok(Frame::Skip) => None,
                Ok(Frame::Done) => None,
                Err(e) => Some(Err(e)),
            }
        })
        .take_until(cancel.cancelled_owned());

    Box::pin(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    /// Helper: serve raw SSE text and return a live reqwest::Response.
    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn parses_deltas_until_done() {
        let sse = "data: {\"content\":\"Hi\"}\n\ndata: {\"content\":\" there\"}\n\ndata: [DONE]\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_delta_stream(response, CancellationToken::new());

        assert_eq!(stream.next().await.unwrap().unwrap().content, "Hi");
        assert_eq!(stream.next().await.unwrap().unwrap().content, " there");
        assert!(stream.next().await.is_none(), "[DONE] ends the sequence");
    }

    #[tokio::test]
    async fn content_after_done_is_never_delivered() {
        let sse = "data: {\"content\":\"a\"}\n\ndata: [DONE]\n\ndata: {\"content\":\"ghost\"}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_delta_stream(response, CancellationToken::new());

        assert_eq!(stream.next().await.unwrap().unwrap().content, "a");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_frame_yields_protocol_error() {
        let sse = "data: not json\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_delta_stream(response, CancellationToken::new());

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, SolaceError::UpstreamProtocol(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn empty_keepalive_frames_are_skipped() {
        let sse = "data: \n\ndata: {\"content\":\"x\"}\n\ndata: [DONE]\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_delta_stream(response, CancellationToken::new());

        assert_eq!(stream.next().await.unwrap().unwrap().content, "x");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_stops_delivery() {
        let sse = "data: {\"content\":\"a\"}\n\ndata: {\"content\":\"b\"}\n\ndata: [DONE]\n\n";
        let response = mock_sse_response(sse).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut stream = parse_delta_stream(response, cancel);

        assert!(stream.next().await.is_none(), "cancelled before first poll");
    }

    #[tokio::test]
    async fn headers_then_immediate_close_yields_empty_stream() {
        let response = mock_sse_response("").await;
        let mut stream = parse_delta_stream(response, CancellationToken::new());
        assert!(stream.next().await.is_none());
    }
}
