// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the upstream model endpoint.
//!
//! Provides [`HttpUpstream`] which handles request construction, auth,
//! connection pooling, and the streaming SSE response. Exactly one
//! upstream is assumed per request; the client never retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use solace_config::model::UpstreamConfig;
use solace_core::types::{CompletionRequest, HealthStatus};
use solace_core::{DeltaStream, SolaceError, UpstreamClient};

use crate::stream;

/// Pooled HTTP client for upstream completions.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
    model: String,
    connect_timeout: Duration,
}

impl HttpUpstream {
    /// Creates a new upstream client from configuration.
    ///
    /// TLS verification is on unless explicitly disabled for development.
    pub fn new(config: &UpstreamConfig) -> Result<Self, SolaceError> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| SolaceError::Config(format!("invalid upstream api key: {e}")))?;
            headers.insert("authorization", value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| SolaceError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        })
    }

    /// Returns the configured default model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn completion_url(&self) -> String {
        format!("{}/completion", self.base_url)
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<DeltaStream, SolaceError> {
        let mut req = request;
        req.stream = true;

        let response = self
            .client
            .post(self.completion_url())
            .json(&req)
            .send()
            .await
            .map_err(|e| map_send_err(e, self.connect_timeout))?;

        let status = response.status();
        debug!(status = %status, model = %req.model, "upstream stream opened");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SolaceError::UpstreamStatus {
                code: status.as_u16(),
                body,
            });
        }

        Ok(stream::parse_delta_stream(response, cancel))
    }

    async fn probe(&self) -> HealthStatus {
        let result = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(3))
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => HealthStatus::Healthy,
            Ok(resp) => HealthStatus::Degraded(format!("upstream returned {}", resp.status())),
            Err(e) => HealthStatus::Unhealthy(format!("upstream unreachable: {e}")),
        }
    }
}

/// Classifies a reqwest send error into the upstream error taxonomy.
/// Connect/TLS/DNS failures are `UpstreamUnavailable`; a request that
/// produced no response within the window is `UpstreamTimeout`.
fn map_send_err(e: reqwest::Error, window: Duration) -> SolaceError {
    if e.is_connect() {
        SolaceError::UpstreamUnavailable(e.to_string())
    } else if e.is_timeout() {
        SolaceError::UpstreamTimeout { duration: window }
    } else {
        SolaceError::UpstreamUnavailable(e.to_string())
    }
}
