// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication.
//!
//! `/signup` and `/login` issue HS256 tokens signed with the configured
//! secret; the middleware verifies them and attaches the caller identity
//! to the request. Passwords are hashed with Argon2id and never leave
//! the store boundary.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use solace_core::SolaceError;

use crate::server::AppState;

/// Signing configuration shared through [`AppState`].
#[derive(Clone)]
pub struct AuthKeys {
    pub secret: String,
    pub token_ttl_hours: i64,
}

impl std::fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthKeys")
            .field("secret", &"[redacted]")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

/// JWT claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    /// Expiry as a Unix timestamp.
    pub exp: i64,
    /// Issued-at as a Unix timestamp.
    pub iat: i64,
}

/// Verified identity attached to authenticated requests.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

/// Issues a bearer token for the given user.
pub fn issue_token(keys: &AuthKeys, user_id: &str, email: &str) -> Result<String, SolaceError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (now + chrono::Duration::hours(keys.token_ttl_hours)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(keys.secret.as_bytes()),
    )
    .map_err(|e| SolaceError::Internal(format!("token signing: {e}")))
}

/// Verifies a bearer token and returns its claims.
pub fn verify_token(keys: &AuthKeys, token: &str) -> Result<Claims, SolaceError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(keys.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| SolaceError::Unauthorized(format!("invalid token: {e}")))
}

/// Hashes a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, SolaceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SolaceError::Internal(format!("password hashing: {e}")))
}

/// Verifies a password against a stored PHC hash string.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Middleware validating the `Authorization: Bearer` header and attaching
/// [`AuthUser`] to the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(crate::handlers::error_response(&SolaceError::Unauthorized(
            "missing bearer token".to_string(),
        )));
    };

    match verify_token(&state.auth, token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser {
                user_id: claims.sub,
                email: claims.email,
            });
            Ok(next.run(request).await)
        }
        Err(e) => Err(crate::handlers::error_response(&e)),
    }
}
