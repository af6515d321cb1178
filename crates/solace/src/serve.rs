// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `solace serve` command implementation.
//!
//! Wires the SQLite store, the upstream HTTP client, the context caches,
//! the rate limiter, and the completion orchestrator into the gateway
//! server. Supports graceful shutdown via signal handlers and runs the
//! background sweeper that purges expired memory and stale rate-limit
//! windows.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use solace_config::SolaceConfig;
use solace_context::{CompressionCache, UserCache};
use solace_core::{SolaceError, Store, UpstreamClient};
use solace_gateway::auth::AuthKeys;
use solace_gateway::limiter::RateLimiter;
use solace_gateway::{start_server, AppState, CompletionSettings, Orchestrator};
use solace_llm::HttpUpstream;
use solace_storage::SqliteStore;

/// Compression cache capacity, shared across all users. One entry per
/// (user, message type, complexity, model) combination.
const COMPRESSION_CACHE_ENTRIES: usize = 1024;

/// Runs the `solace serve` command.
///
/// Returns an error (and a non-zero process exit) when the store cannot
/// be opened at startup.
pub async fn run_serve(config: SolaceConfig) -> Result<(), SolaceError> {
    init_tracing(&config.server.log_level);
    solace_gateway::metrics::register_metrics();

    info!("starting solace serve");

    let Some(token_secret) = config.auth.token_secret.clone() else {
        error!("auth.token_secret is not configured");
        eprintln!(
            "error: bearer-token secret required. Set auth.token_secret or SOLACE_AUTH_TOKEN_SECRET."
        );
        return Err(SolaceError::Config("auth.token_secret missing".into()));
    };

    // Store-connect failure at startup is fatal by contract.
    let store: Arc<dyn Store> = {
        let store = SqliteStore::new(config.storage.database_path.clone());
        store.initialize().await.map_err(|e| {
            error!(error = %e, "store initialization failed");
            e
        })?;
        Arc::new(store)
    };

    let upstream: Arc<dyn UpstreamClient> = Arc::new(HttpUpstream::new(&config.upstream)?);
    if !config.upstream.verify_tls {
        warn!("upstream TLS verification is DISABLED -- development only");
    }

    let user_cache = Arc::new(UserCache::new(Duration::from_secs(
        config.memory.cache_ttl_secs,
    )));
    let comp_cache = Arc::new(CompressionCache::new(COMPRESSION_CACHE_ENTRIES));
    let limiter = Arc::new(RateLimiter::new(
        Duration::from_secs(config.limits.general_window_secs),
        config.limits.general_max,
        Duration::from_secs(config.limits.completion_window_secs),
        config.limits.completion_max,
    ));

    let settings = CompletionSettings::from_config(&config.completion, &config.upstream.model);
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        upstream.clone(),
        user_cache.clone(),
        comp_cache.clone(),
        limiter.clone(),
        settings,
    ));

    let state = AppState {
        store: store.clone(),
        upstream,
        user_cache,
        comp_cache,
        limiter: limiter.clone(),
        orchestrator,
        auth: AuthKeys {
            secret: token_secret,
            token_ttl_hours: config.auth.token_ttl_hours,
        },
    };

    let cancel = install_signal_handler();

    // Background sweeper: expired memory rows and idle limiter windows.
    {
        let store = store.clone();
        let limiter = limiter.clone();
        let sweep_cancel = cancel.clone();
        let interval_secs = config.storage.sweep_interval_secs;
        let ttl_hours = config.memory.ttl_hours;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            // Skip the immediate first tick.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match store.purge_expired_memory(ttl_hours).await {
                            Ok(0) => {}
                            Ok(purged) => info!(purged, "expired memory purged"),
                            Err(e) => warn!(error = %e, "memory sweep failed (non-fatal)"),
                        }
                        limiter.prune_stale();
                    }
                    _ = sweep_cancel.cancelled() => {
                        info!("sweeper shutting down");
                        break;
                    }
                }
            }
        });
        info!(
            interval_secs,
            ttl_hours, "memory sweeper started"
        );
    }

    start_server(&config.server.host, config.server.port, state, cancel).await?;

    // Drain: checkpoint and close the store after the listener stops.
    store.close().await?;
    info!("solace serve shutdown complete");
    Ok(())
}

/// Installs SIGINT/SIGTERM handlers that fire one shared token.
fn install_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let ctrl_c = tokio::signal::ctrl_c();
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate(),
                ) {
                    Ok(signal) => signal,
                    Err(e) => {
                        warn!(error = %e, "SIGTERM handler unavailable");
                        let _ = ctrl_c.await;
                        cancel.cancel();
                        return;
                    }
                };
                tokio::select! {
                    _ = ctrl_c => info!("SIGINT received"),
                    _ = sigterm.recv() => info!("SIGTERM received"),
                }
            }
            #[cfg(not(unix))]
            {
                let _ = ctrl_c.await;
                info!("SIGINT received");
            }
            cancel.cancel();
        });
    }

    cancel
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("solace={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
