// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Flatrelay notification relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Flatrelay configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Process identity, logging and command surface.
    #[serde(default)]
    pub relay: RelaySection,

    /// Discord bot settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Upstream notification feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Poll scheduler pacing.
    #[serde(default)]
    pub poller: PollerConfig,

    /// Interactive command settings.
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Backing store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential encryption settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Liveness endpoint settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Process identity and command surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prefix every chat command starts with.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Community link shown in help and error replies.
    #[serde(default = "default_support_url")]
    pub support_url: String,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            command_prefix: default_command_prefix(),
            support_url: default_support_url(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_command_prefix() -> String {
    "!flatnotifs".to_string()
}

fn default_support_url() -> String {
    "https://discord.gg/s5xXz8Nfun".to_string()
}

/// Discord bot configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Bot token. Required by `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Upstream feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    /// API root, without trailing slash.
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,

    /// Notifications requested per fetch.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Width of the outbound admission gate.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection pool replacement period in seconds.
    #[serde(default = "default_pool_refresh_secs")]
    pub pool_refresh_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            page_size: default_page_size(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_secs: default_request_timeout_secs(),
            pool_refresh_secs: default_pool_refresh_secs(),
        }
    }
}

fn default_feed_base_url() -> String {
    "https://api.flat.io/v2".to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_pool_refresh_secs() -> u64 {
    24 * 60 * 60
}

/// Poll scheduler pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollerConfig {
    /// Delay between users within a cycle.
    #[serde(default = "default_per_user_delay_secs")]
    pub per_user_delay_secs: u64,

    /// Delay between users during startup.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Cycle interval when nobody is registered.
    #[serde(default = "default_idle_interval_secs")]
    pub idle_interval_secs: u64,

    /// Dedup cursor capacity. Must be at least `feed.page_size`.
    #[serde(default = "default_cursor_capacity")]
    pub cursor_capacity: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            per_user_delay_secs: default_per_user_delay_secs(),
            startup_delay_secs: default_startup_delay_secs(),
            idle_interval_secs: default_idle_interval_secs(),
            cursor_capacity: default_cursor_capacity(),
        }
    }
}

fn default_per_user_delay_secs() -> u64 {
    30
}

fn default_startup_delay_secs() -> u64 {
    15
}

fn default_idle_interval_secs() -> u64 {
    60
}

fn default_cursor_capacity() -> usize {
    100
}

/// Interactive command settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommandsConfig {
    /// How long a Y/N confirmation prompt waits for a reply.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// Pause between consecutive username lookups.
    #[serde(default = "default_lookup_delay_secs")]
    pub lookup_delay_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            confirm_timeout_secs: default_confirm_timeout_secs(),
            lookup_delay_secs: default_lookup_delay_secs(),
        }
    }
}

fn default_confirm_timeout_secs() -> u64 {
    30
}

fn default_lookup_delay_secs() -> u64 {
    1
}

/// Which backing store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Json,
}

/// Backing store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Path to the JSON snapshot file.
    #[serde(default = "default_json_path")]
    pub json_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            json_path: default_json_path(),
        }
    }
}

fn data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("flatrelay"))
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}

fn default_database_path() -> String {
    data_dir().join("flatrelay.db").display().to_string()
}

fn default_json_path() -> String {
    data_dir().join("data.json").display().to_string()
}

/// Credential encryption configuration.
///
/// Either `key` (base64, 32 bytes) or `passphrase` plus `salt` must be set
/// before `serve` can start.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub passphrase: Option<String>,

    /// Base64 salt for passphrase derivation (at least 16 bytes).
    #[serde(default)]
    pub salt: Option<String>,

    /// Argon2id memory cost in KiB.
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key: None,
            passphrase: None,
            salt: None,
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    65536
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

/// Liveness endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Fixed response body for `GET /`.
    #[serde(default = "default_gateway_body")]
    pub body: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            body: default_gateway_body(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    7860
}

fn default_gateway_body() -> String {
    "I'm alive".to_string()
}
