// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upstream LLM client trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::SolaceError;
use crate::types::{CompletionRequest, Delta, HealthStatus};

/// A lazy, finite, non-restartable sequence of upstream token deltas.
///
/// The stream ends after the upstream's `[DONE]` marker. Dropping it
/// releases the underlying connection back to the pool.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta, SolaceError>> + Send>>;

/// Client for the configured upstream model endpoint.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Opens a streaming completion. Errors returned here occurred before
    /// any byte was produced and map to plain HTTP statuses; errors yielded
    /// by the stream are mid-stream and must be reported in-band.
    ///
    /// Cancelling `cancel` stops delivery within one network-buffer
    /// quantum; cancellation is idempotent.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<DeltaStream, SolaceError>;

    /// Probes the upstream endpoint for the `/health` report.
    async fn probe(&self) -> HealthStatus;
}
