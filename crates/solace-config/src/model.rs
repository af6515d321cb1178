// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Solace gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Solace configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SolaceConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upstream model endpoint settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Bearer-token auth settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Rate-limit window settings.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Completion pipeline settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Memory retention settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Connection string for the user/memory/task store (SQLite path).
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Background sweep interval for expired memory, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_database_path() -> String {
    "solace.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// Upstream model endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the model endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional bearer key sent to the upstream.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum idle pooled sockets per host.
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,

    /// Verify upstream TLS certificates. Disable only for development.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_idle_per_host: default_max_idle_per_host(),
            verify_tls: default_verify_tls(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_model() -> String {
    "solace-chat-1".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_idle_per_host() -> usize {
    32
}

fn default_verify_tls() -> bool {
    true
}

/// Bearer-token auth configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret for issued bearer tokens. Required to serve.
    #[serde(default)]
    pub token_secret: Option<String>,

    /// Issued token lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

fn default_token_ttl_hours() -> i64 {
    24 * 30
}

/// Rate-limit window configuration. Both windows must admit a completion.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// General window length in seconds.
    #[serde(default = "default_general_window_secs")]
    pub general_window_secs: u64,

    /// Maximum requests per general window.
    #[serde(default = "default_general_max")]
    pub general_max: u32,

    /// Completion window length in seconds.
    #[serde(default = "default_completion_window_secs")]
    pub completion_window_secs: u64,

    /// Maximum completions per completion window.
    #[serde(default = "default_completion_max")]
    pub completion_max: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            general_window_secs: default_general_window_secs(),
            general_max: default_general_max(),
            completion_window_secs: default_completion_window_secs(),
            completion_max: default_completion_max(),
        }
    }
}

fn default_general_window_secs() -> u64 {
    300
}

fn default_general_max() -> u32 {
    500
}

fn default_completion_window_secs() -> u64 {
    60
}

fn default_completion_max() -> u32 {
    30
}

/// Completion pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// Hard wall-clock limit for one stream, in seconds.
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,

    /// Maximum silence before the stream is abandoned, in seconds.
    /// Reset on every non-empty delta.
    #[serde(default = "default_first_byte_timeout_secs")]
    pub first_byte_timeout_secs: u64,

    /// Delta count after which the stream is drained.
    #[serde(default = "default_token_cap")]
    pub token_cap: u32,

    /// Upper clamp on requested prediction length.
    #[serde(default = "default_max_predict")]
    pub max_predict: u32,

    /// Upper clamp on sampling temperature.
    #[serde(default = "default_max_temperature")]
    pub max_temperature: f32,

    /// Recent memory messages included in the prompt.
    #[serde(default = "default_history_window")]
    pub history_window: i64,

    /// Tasks claimed per `/run-tasks` drain.
    #[serde(default = "default_task_batch")]
    pub task_batch: i64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            stream_timeout_secs: default_stream_timeout_secs(),
            first_byte_timeout_secs: default_first_byte_timeout_secs(),
            token_cap: default_token_cap(),
            max_predict: default_max_predict(),
            max_temperature: default_max_temperature(),
            history_window: default_history_window(),
            task_batch: default_task_batch(),
        }
    }
}

fn default_stream_timeout_secs() -> u64 {
    45
}

fn default_first_byte_timeout_secs() -> u64 {
    30
}

fn default_token_cap() -> u32 {
    800
}

fn default_max_predict() -> u32 {
    1000
}

fn default_max_temperature() -> f32 {
    0.85
}

fn default_history_window() -> i64 {
    6
}

fn default_task_batch() -> i64 {
    10
}

/// Memory retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Hours before a memory message is purged.
    #[serde(default = "default_memory_ttl_hours")]
    pub ttl_hours: i64,

    /// User cache entry lifetime in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_memory_ttl_hours(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_memory_ttl_hours() -> i64 {
    24
}

fn default_cache_ttl_secs() -> u64 {
    30
}
