// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted [`UpstreamClient`] for deterministic pipeline tests.
//!
//! Each call to `stream_completion` pops one script from a FIFO queue and
//! plays it back as a delta stream. Scripts can interleave deltas,
//! mid-stream errors, delays, and a terminal hang (for timeout tests).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::StreamExt;
use tokio_util::sync::CancellationToken;

use solace_core::types::{CompletionRequest, Delta, HealthStatus};
use solace_core::{DeltaStream, SolaceError, UpstreamClient};

/// One scripted stream event.
#[derive(Debug, Clone)]
pub enum ScriptEvent {
    /// Yield one `{content}` delta.
    Delta(String),
    /// Yield a mid-stream error.
    Error(String),
    /// Sleep before the next event.
    Delay(Duration),
    /// Never produce another event (until cancelled).
    Hang,
}

/// A scripted upstream. Streams end naturally after the last event,
/// standing in for the upstream's `[DONE]`.
#[derive(Default)]
pub struct ScriptedUpstream {
    scripts: Mutex<VecDeque<Vec<ScriptEvent>>>,
    open_error: Mutex<Option<SolaceError>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts one stream that yields the given delta contents then ends.
    pub fn with_deltas(deltas: Vec<&str>) -> Self {
        let upstream = Self::new();
        upstream.push_script(
            deltas
                .into_iter()
                .map(|d| ScriptEvent::Delta(d.to_string()))
                .collect(),
        );
        upstream
    }

    /// Scripts one stream with arbitrary events.
    pub fn with_script(script: Vec<ScriptEvent>) -> Self {
        let upstream = Self::new();
        upstream.push_script(script);
        upstream
    }

    /// Fails the next `stream_completion` call before any byte.
    pub fn with_open_error(error: SolaceError) -> Self {
        let upstream = Self::new();
        *upstream.open_error.lock().expect("lock") = Some(error);
        upstream
    }

    /// Appends another script to the queue.
    pub fn push_script(&self, script: Vec<ScriptEvent>) {
        self.scripts.lock().expect("lock").push_back(script);
    }

    /// Requests seen so far, for prompt-assembly assertions.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl UpstreamClient for ScriptedUpstream {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<DeltaStream, SolaceError> {
        if let Some(error) = self.open_error.lock().expect("lock").take() {
            return Err(error);
        }
        self.requests.lock().expect("lock").push(request);

        let script = self
            .scripts
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_default();

        let stream = futures::stream::unfold(script.into_iter(), |mut events| async move {
            loop {
                match events.next()? {
                    ScriptEvent::Delta(content) => {
                        return Some((Ok(Delta { content }), events));
                    }
                    ScriptEvent::Error(message) => {
                        return Some((Err(SolaceError::UpstreamProtocol(message)), events));
                    }
                    ScriptEvent::Delay(duration) => {
                        tokio::time::sleep(duration).await;
                    }
                    ScriptEvent::Hang => {
                        std::future::pending::<()>().await;
                    }
                }
            }
        })
        .take_until(cancel.cancelled_owned());

        Ok(Box::pin(stream))
    }

    async fn probe(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solace_core::types::ChatMessage;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test".to_string(),
            messages: vec![ChatMessage::new("user", "hi")],
            n_predict: 10,
            temperature: 0.5,
            stream: true,
        }
    }

    #[tokio::test]
    async fn scripted_deltas_play_back_in_order() {
        let upstream = ScriptedUpstream::with_deltas(vec!["a", "b"]);
        let mut stream = upstream
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().content, "a");
        assert_eq!(stream.next().await.unwrap().unwrap().content, "b");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn open_error_fails_before_any_byte() {
        let upstream =
            ScriptedUpstream::with_open_error(SolaceError::UpstreamUnavailable("down".into()));
        let err = match upstream
            .stream_completion(request(), CancellationToken::new())
            .await
        {
            Ok(_) => panic!("expected stream_completion to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, SolaceError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn mid_stream_error_is_yielded_in_band() {
        let upstream = ScriptedUpstream::with_script(vec![
            ScriptEvent::Delta("ok".to_string()),
            ScriptEvent::Error("boom".to_string()),
        ]);
        let mut stream = upstream
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_hung_stream() {
        let upstream = ScriptedUpstream::with_script(vec![
            ScriptEvent::Delta("x".to_string()),
            ScriptEvent::Hang,
        ]);
        let cancel = CancellationToken::new();
        let mut stream = upstream
            .stream_completion(request(), cancel.clone())
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().content, "x");
        cancel.cancel();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn second_stream_uses_next_script() {
        let upstream = ScriptedUpstream::with_deltas(vec!["first"]);
        upstream.push_script(vec![ScriptEvent::Delta("second".to_string())]);

        let mut s1 = upstream
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(s1.next().await.unwrap().unwrap().content, "first");

        let mut s2 = upstream
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(s2.next().await.unwrap().unwrap().content, "second");
    }
}
