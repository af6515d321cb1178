// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Pre-stream errors become JSON responses with a mapped status; once an
//! SSE response has started, failures are reported in-band by the
//! orchestrator instead.

use std::collections::BTreeMap;

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::error;

use solace_core::types::{EmotionEntry, IntelligenceContext, User};
use solace_core::SolaceError;

use crate::auth::{self, AuthUser};
use crate::commit::now_iso;
use crate::metrics;
use crate::orchestrator::CompletionOptions;
use crate::server::AppState;
use crate::sse::{self, RelayFrame};
use crate::tasks;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Maps an error to its HTTP response. Rate-limited responses carry a
/// `retry-after` hint.
pub(crate) fn error_response(err: &SolaceError) -> Response {
    let status = match err {
        SolaceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SolaceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        SolaceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        SolaceError::UserNotFound(_) => StatusCode::NOT_FOUND,
        SolaceError::UpstreamUnavailable(_)
        | SolaceError::UpstreamStatus { .. }
        | SolaceError::UpstreamProtocol(_) => StatusCode::BAD_GATEWAY,
        SolaceError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SolaceError::Storage { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SolaceError::CommitFailed(_) | SolaceError::Config(_) | SolaceError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let body = Json(ErrorBody {
        error: err.to_string(),
    });
    if let SolaceError::RateLimited { retry_after_secs } = err {
        (
            status,
            [("retry-after", retry_after_secs.to_string())],
            body,
        )
            .into_response()
    } else {
        (status, body).into_response()
    }
}

// --- Auth ---

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: SafeUser,
}

/// User fields safe to return to clients.
#[derive(Debug, Serialize)]
pub struct SafeUser {
    pub id: String,
    pub email: String,
    pub profile: BTreeMap<String, String>,
    pub premium: bool,
    pub created_at: String,
}

impl From<User> for SafeUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            profile: user.profile,
            premium: user.premium,
            created_at: user.created_at,
        }
    }
}

fn validate_credentials(body: &CredentialsBody) -> Result<String, SolaceError> {
    let email = body.email.trim().to_lowercase();
    if !email.contains('@') || !email.contains('.') {
        return Err(SolaceError::InvalidInput("invalid email address".into()));
    }
    if body.password.len() < 8 {
        return Err(SolaceError::InvalidInput(
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(email)
}

/// POST /signup
pub async fn post_signup(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Response {
    let email = match validate_credentials(&body) {
        Ok(email) => email,
        Err(e) => return error_response(&e),
    };
    let password_hash = match auth::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => return error_response(&e),
    };

    let now = now_iso();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.clone(),
        password_hash,
        profile: BTreeMap::new(),
        premium: false,
        created_at: now.clone(),
        updated_at: now,
    };
    if let Err(e) = state.store.create_user(&user).await {
        return error_response(&e);
    }

    match auth::issue_token(&state.auth, &user.id, &user.email) {
        Ok(token) => (
            StatusCode::CREATED,
            Json(TokenResponse {
                token,
                user: user.into(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /login
pub async fn post_login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Response {
    let email = body.email.trim().to_lowercase();
    let user = match state.store.get_user_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return error_response(&SolaceError::Unauthorized("invalid credentials".into()))
        }
        Err(e) => return error_response(&e),
    };
    if !auth::verify_password(&body.password, &user.password_hash) {
        return error_response(&SolaceError::Unauthorized("invalid credentials".into()));
    }
    match auth::issue_token(&state.auth, &user.id, &user.email) {
        Ok(token) => Json(TokenResponse {
            token,
            user: user.into(),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

// --- Profile ---

/// GET /profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Response {
    match state.store.get_user(&auth_user.user_id).await {
        Ok(Some(user)) => Json(SafeUser::from(user)).into_response(),
        Ok(None) => error_response(&SolaceError::UserNotFound(auth_user.user_id)),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileBody {
    pub profile: BTreeMap<String, String>,
}

/// PUT /profile
pub async fn put_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ProfileBody>,
) -> Response {
    if let Err(e) = state
        .store
        .update_profile(&auth_user.user_id, &body.profile)
        .await
    {
        return error_response(&e);
    }
    state.user_cache.invalidate(&auth_user.user_id);
    Json(serde_json::json!({ "updated": true })).into_response()
}

// --- Emotions ---

#[derive(Debug, Deserialize)]
pub struct EmotionBody {
    pub mood: String,
    pub intensity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// POST /emotions
pub async fn post_emotions(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<EmotionBody>,
) -> Response {
    if body.mood.trim().is_empty() {
        return error_response(&SolaceError::InvalidInput("mood must not be empty".into()));
    }
    if !(1..=10).contains(&body.intensity) {
        return error_response(&SolaceError::InvalidInput(
            "intensity must be between 1 and 10".into(),
        ));
    }
    let entry = EmotionEntry {
        emotion: body.mood.trim().to_string(),
        intensity: Some(body.intensity),
        context: body.notes,
        created_at: now_iso(),
    };
    match state.store.append_emotion(&auth_user.user_id, &entry).await {
        Ok(()) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct EmotionQuery {
    #[serde(default = "default_emotion_limit")]
    pub limit: i64,
}

fn default_emotion_limit() -> i64 {
    20
}

/// GET /emotions
pub async fn get_emotions(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<EmotionQuery>,
) -> Response {
    match state
        .store
        .recent_emotions(&auth_user.user_id, query.limit.clamp(1, 200))
        .await
    {
        Ok(entries) => Json(serde_json::json!({ "emotions": entries })).into_response(),
        Err(e) => error_response(&e),
    }
}

// --- Tasks ---

/// GET /run-tasks
pub async fn get_run_tasks(State(state): State<AppState>) -> Response {
    match tasks::run_pending(state.store.as_ref(), state.orchestrator.settings().task_batch).await
    {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(&e),
    }
}

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub server: String,
    pub database: String,
    pub llm_api: String,
}

fn status_string(status: solace_core::HealthStatus) -> String {
    match status {
        solace_core::HealthStatus::Healthy => "ok".to_string(),
        solace_core::HealthStatus::Degraded(why) => format!("degraded: {why}"),
        solace_core::HealthStatus::Unhealthy(why) => format!("error: {why}"),
    }
}

/// GET /health (unauthenticated)
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.health_check().await {
        Ok(status) => status_string(status),
        Err(e) => format!("error: {e}"),
    };
    let llm_api = status_string(state.upstream.probe().await);
    Json(HealthResponse {
        server: "ok".to_string(),
        database,
        llm_api,
    })
}

// --- Completion ---

#[derive(Debug, Deserialize)]
pub struct CompletionBody {
    pub prompt: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub complexity: Option<f64>,
    #[serde(default)]
    pub intelligence: Option<IntelligenceContext>,
    #[serde(default)]
    pub n_predict: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_stream() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub content: String,
}

/// POST /completion
///
/// With `stream:true` (the default) responds as SSE; otherwise buffers
/// the whole reply and returns `{content}` JSON. Both paths run the same
/// pipeline and commit the same side-effects.
pub async fn post_completion(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CompletionBody>,
) -> Response {
    let opts = CompletionOptions {
        message_type: body.message_type,
        complexity: body.complexity,
        intelligence: body.intelligence,
        n_predict: body.n_predict,
        temperature: body.temperature,
    };

    let prepared = match state
        .orchestrator
        .prepare(&auth_user.user_id, &body.prompt, opts)
        .await
    {
        Ok(prepared) => prepared,
        Err(e) => {
            metrics::record_completion(match e {
                SolaceError::RateLimited { .. } => "rejected_limit",
                SolaceError::InvalidInput(_) => "rejected_input",
                _ => "internal_error",
            });
            return error_response(&e);
        }
    };

    // Open the upstream before writing any response byte, so connect
    // failures still surface as a plain HTTP 502.
    let (stream, cancel) = match state.orchestrator.open_stream(&prepared).await {
        Ok(pair) => pair,
        Err(e) => {
            error!(request_id = %prepared.request_id, error = %e, "upstream open failed");
            metrics::record_completion("upstream_failed");
            return error_response(&e);
        }
    };

    if body.stream {
        let (tx, rx) = mpsc::channel::<RelayFrame>(sse::RELAY_BUFFER);
        let guard = cancel.clone().drop_guard();
        let orchestrator = state.orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.run(prepared, stream, cancel, Some(tx)).await;
        });
        sse::sse_response(rx, guard)
    } else {
        let result = state
            .orchestrator
            .run(prepared, stream, cancel, None)
            .await;
        Json(CompletionResponse {
            content: result.content,
        })
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_body_defaults_to_streaming() {
        let body: CompletionBody = serde_json::from_str(r#"{"prompt":"hello"}"#).unwrap();
        assert!(body.stream);
        assert!(body.intelligence.is_none());
        assert!(body.n_predict.is_none());
    }

    #[test]
    fn completion_body_accepts_full_payload() {
        let body: CompletionBody = serde_json::from_str(
            r#"{
                "prompt": "plan my day",
                "stream": false,
                "message_type": "question",
                "complexity": 7,
                "intelligence": {"micro": {"primaryEmotion": "focused"}},
                "n_predict": 256,
                "temperature": 0.5
            }"#,
        )
        .unwrap();
        assert!(!body.stream);
        assert_eq!(body.message_type.as_deref(), Some("question"));
        assert_eq!(body.n_predict, Some(256));
        assert!(body.intelligence.is_some());
    }

    #[test]
    fn error_mapping_covers_the_contract() {
        let cases = [
            (SolaceError::InvalidInput("x".into()), 400),
            (SolaceError::Unauthorized("x".into()), 401),
            (SolaceError::RateLimited { retry_after_secs: 9 }, 429),
            (SolaceError::UserNotFound("x".into()), 404),
            (SolaceError::UpstreamUnavailable("x".into()), 502),
            (
                SolaceError::UpstreamStatus {
                    code: 500,
                    body: String::new(),
                },
                502,
            ),
            (
                SolaceError::UpstreamTimeout {
                    duration: std::time::Duration::from_secs(1),
                },
                504,
            ),
            (SolaceError::Internal("x".into()), 500),
        ];
        for (err, expected) in cases {
            let response = error_response(&err);
            assert_eq!(response.status().as_u16(), expected, "{err}");
        }
    }

    #[test]
    fn rate_limited_response_carries_retry_after() {
        let response = error_response(&SolaceError::RateLimited {
            retry_after_secs: 17,
        });
        assert_eq!(
            response.headers().get("retry-after").unwrap(),
            &"17".parse::<axum::http::HeaderValue>().unwrap()
        );
    }

    #[test]
    fn safe_user_omits_password_hash() {
        let user = User {
            id: "u-1".into(),
            email: "a@example.com".into(),
            password_hash: "sensitive".into(),
            profile: BTreeMap::new(),
            premium: true,
            created_at: "t".into(),
            updated_at: "t".into(),
        };
        let json = serde_json::to_string(&SafeUser::from(user)).unwrap();
        assert!(!json.contains("sensitive"));
        assert!(json.contains("a@example.com"));
        assert!(json.contains("\"premium\":true"));
    }

    #[test]
    fn credentials_validation() {
        let good = CredentialsBody {
            email: " Alice@Example.COM ".into(),
            password: "longenough".into(),
        };
        assert_eq!(validate_credentials(&good).unwrap(), "alice@example.com");

        let bad_email = CredentialsBody {
            email: "nope".into(),
            password: "longenough".into(),
        };
        assert!(validate_credentials(&bad_email).is_err());

        let short_password = CredentialsBody {
            email: "a@b.com".into(),
            password: "short".into(),
        };
        assert!(validate_credentials(&short_password).is_err());
    }
}
