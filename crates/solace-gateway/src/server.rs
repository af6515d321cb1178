// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. `/signup`, `/login`,
//! and `/health` are public; everything else requires a bearer token.
//! The general rate-limit window wraps the whole router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use solace_context::{CompressionCache, UserCache};
use solace_core::{SolaceError, Store, UpstreamClient};

use crate::auth::{self, AuthKeys};
use crate::handlers;
use crate::limiter::{self, RateLimiter};
use crate::orchestrator::Orchestrator;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub upstream: Arc<dyn UpstreamClient>,
    pub user_cache: Arc<UserCache>,
    pub comp_cache: Arc<CompressionCache>,
    pub limiter: Arc<RateLimiter>,
    pub orchestrator: Arc<Orchestrator>,
    pub auth: AuthKeys,
}

/// Builds the full application router over the given state.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/signup", post(handlers::post_signup))
        .route("/login", post(handlers::post_login))
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::put_profile),
        )
        .route("/completion", post(handlers::post_completion))
        .route(
            "/emotions",
            get(handlers::get_emotions).post(handlers::post_emotions),
        )
        .route("/run-tasks", get(handlers::get_run_tasks))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.limiter.clone(),
            limiter::rate_limit_middleware,
        ))
        .layer(CorsLayer::permissive())
}

/// Binds and serves until `shutdown` fires. In-flight requests drain
/// before the future resolves.
pub async fn start_server(
    host: &str,
    port: u16,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), SolaceError> {
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SolaceError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    info!("gateway listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|e| SolaceError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::CompletionSettings;
    use solace_config::model::CompletionConfig;
    use solace_test_utils::{InMemoryStore, ScriptedUpstream};
    use std::time::Duration;

    pub(crate) fn test_state() -> AppState {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let upstream: Arc<dyn UpstreamClient> = Arc::new(ScriptedUpstream::new());
        let user_cache = Arc::new(UserCache::new(Duration::from_secs(30)));
        let comp_cache = Arc::new(CompressionCache::new(16));
        let limiter = Arc::new(RateLimiter::new(
            Duration::from_secs(300),
            500,
            Duration::from_secs(60),
            30,
        ));
        let settings = CompletionSettings::from_config(&CompletionConfig::default(), "solace-chat-1");
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            upstream.clone(),
            user_cache.clone(),
            comp_cache.clone(),
            limiter.clone(),
            settings,
        ));
        AppState {
            store,
            upstream,
            user_cache,
            comp_cache,
            limiter,
            orchestrator,
            auth: AuthKeys {
                secret: "test-secret".to_string(),
                token_ttl_hours: 1,
            },
        }
    }

    #[test]
    fn app_state_is_clone() {
        let state = test_state();
        let _cloned = state.clone();
    }

    #[tokio::test]
    async fn router_builds_over_test_state() {
        let _router = build_router(test_state());
    }

    #[tokio::test]
    async fn server_binds_and_shuts_down() {
        let shutdown = CancellationToken::new();
        let state = test_state();
        let server = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { start_server("127.0.0.1", 0, state, shutdown).await }
        });
        // Give the listener a beat, then stop it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .expect("server should shut down promptly")
            .unwrap();
        assert!(result.is_ok());
    }
}
