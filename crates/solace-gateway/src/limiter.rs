// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-tier fixed-window rate limiter.
//!
//! Every request consumes from the *general* window (keyed by client IP
//! through the middleware); completions additionally consume from the
//! *completion* window (keyed by authenticated user id). Both windows
//! must admit a completion. Loopback addresses bypass the middleware so
//! local development is never throttled.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tracing::warn;

use solace_core::SolaceError;

/// The two independent limit scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    General,
    Completion,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy)]
struct WindowConfig {
    length: Duration,
    max: u32,
}

/// Fixed-window counters backed by an in-process map.
pub struct RateLimiter {
    windows: DashMap<(Scope, String), Window>,
    general: WindowConfig,
    completion: WindowConfig,
}

impl RateLimiter {
    pub fn new(
        general_window: Duration,
        general_max: u32,
        completion_window: Duration,
        completion_max: u32,
    ) -> Self {
        Self {
            windows: DashMap::new(),
            general: WindowConfig {
                length: general_window,
                max: general_max,
            },
            completion: WindowConfig {
                length: completion_window,
                max: completion_max,
            },
        }
    }

    /// Consumes one slot from `scope` for `identity`.
    ///
    /// Returns `RateLimited` with a retry-after hint when the window is
    /// already full.
    pub fn check(&self, scope: Scope, identity: &str) -> Result<(), SolaceError> {
        let config = match scope {
            Scope::General => self.general,
            Scope::Completion => self.completion,
        };
        let mut entry = self
            .windows
            .entry((scope, identity.to_string()))
            .or_insert(Window {
                start: Instant::now(),
                count: 0,
            });

        let elapsed = entry.start.elapsed();
        if elapsed >= config.length {
            entry.start = Instant::now();
            entry.count = 0;
        }

        if entry.count < config.max {
            entry.count += 1;
            Ok(())
        } else {
            let retry_after_secs = config.length.saturating_sub(elapsed).as_secs().max(1);
            Err(SolaceError::RateLimited { retry_after_secs })
        }
    }

    /// Drops windows that have been idle for a full window length.
    pub fn prune_stale(&self) {
        let general = self.general.length;
        let completion = self.completion.length;
        self.windows.retain(|(scope, _), window| {
            let length = match scope {
                Scope::General => general,
                Scope::Completion => completion,
            };
            window.start.elapsed() < length
        });
    }

    /// Number of live windows, for tests and diagnostics.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

/// Middleware enforcing the general window, keyed by client IP.
/// Loopback addresses bypass.
pub async fn rate_limit_middleware(
    State(limiter): State<std::sync::Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request);

    if let Some(ip) = ip {
        if !ip.is_loopback() {
            if let Err(SolaceError::RateLimited { retry_after_secs }) =
                limiter.check(Scope::General, &ip.to_string())
            {
                warn!(ip = %ip, "general rate limit exceeded");
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("retry-after", retry_after_secs.to_string())],
                    axum::Json(serde_json::json!({
                        "error": "rate limited",
                        "retry_after_secs": retry_after_secs,
                    })),
                )
                    .into_response();
            }
        }
    }

    next.run(request).await
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip(req: &Request) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    None
}
