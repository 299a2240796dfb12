// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: the cursor must cover a
//! whole feed page, delays and widths must be non-zero, and paths and hosts
//! must be usable.

use crate::diagnostic::ConfigError;
use crate::model::{RelayConfig, StorageBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.relay.log_level.as_str()) {
        fail(format!(
            "relay.log_level `{}` must be one of {}",
            config.relay.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let prefix = &config.relay.command_prefix;
    if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
        fail(format!(
            "relay.command_prefix `{prefix}` must be non-empty and contain no whitespace"
        ));
    }

    if config.feed.base_url.trim().is_empty() {
        fail("feed.base_url must not be empty".to_string());
    } else if !(config.feed.base_url.starts_with("http://")
        || config.feed.base_url.starts_with("https://"))
    {
        fail(format!(
            "feed.base_url `{}` must start with http:// or https://",
            config.feed.base_url
        ));
    }

    if config.feed.page_size == 0 {
        fail("feed.page_size must be at least 1".to_string());
    }

    if config.feed.max_concurrent_requests == 0 {
        fail("feed.max_concurrent_requests must be at least 1".to_string());
    }

    if config.feed.request_timeout_secs == 0 {
        fail("feed.request_timeout_secs must be at least 1".to_string());
    }

    if config.feed.pool_refresh_secs == 0 {
        fail("feed.pool_refresh_secs must be at least 1".to_string());
    }

    if config.poller.cursor_capacity < config.feed.page_size {
        fail(format!(
            "poller.cursor_capacity ({}) must be at least feed.page_size ({})",
            config.poller.cursor_capacity, config.feed.page_size
        ));
    }

    if config.poller.per_user_delay_secs == 0 {
        fail("poller.per_user_delay_secs must be at least 1".to_string());
    }

    if config.poller.idle_interval_secs == 0 {
        fail("poller.idle_interval_secs must be at least 1".to_string());
    }

    if config.commands.confirm_timeout_secs == 0 {
        fail("commands.confirm_timeout_secs must be at least 1".to_string());
    }

    match config.storage.backend {
        StorageBackend::Sqlite if config.storage.database_path.trim().is_empty() => {
            fail("storage.database_path must not be empty".to_string());
        }
        StorageBackend::Json if config.storage.json_path.trim().is_empty() => {
            fail("storage.json_path must not be empty".to_string());
        }
        _ => {}
    }

    if config.vault.key.is_some() && config.vault.passphrase.is_some() {
        fail("vault.key and vault.passphrase are mutually exclusive".to_string());
    }

    if config.vault.passphrase.is_some() && config.vault.salt.is_none() {
        fail("vault.salt is required when vault.passphrase is set".to_string());
    }

    if config.vault.kdf_memory_cost < 32768 {
        fail(format!(
            "vault.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
            config.vault.kdf_memory_cost
        ));
    }

    if config.vault.kdf_iterations < 2 {
        fail(format!(
            "vault.kdf_iterations must be at least 2, got {}",
            config.vault.kdf_iterations
        ));
    }

    if config.vault.kdf_parallelism < 1 {
        fail(format!(
            "vault.kdf_parallelism must be at least 1, got {}",
            config.vault.kdf_parallelism
        ));
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        if !is_ip && !is_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &RelayConfig) -> Vec<String> {
        match validate_config(config) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn cursor_smaller_than_page_is_rejected() {
        let mut config = RelayConfig::default();
        config.feed.page_size = 50;
        config.poller.cursor_capacity = 20;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("cursor_capacity"));
    }

    #[test]
    fn all_problems_are_collected() {
        let mut config = RelayConfig::default();
        config.feed.page_size = 0;
        config.poller.per_user_delay_secs = 0;
        config.relay.command_prefix = "!flat notifs".into();
        assert_eq!(messages(&config).len(), 3);
    }

    #[test]
    fn passphrase_requires_salt() {
        let mut config = RelayConfig::default();
        config.vault.passphrase = Some("hunter2".into());
        assert!(messages(&config).iter().any(|m| m.contains("vault.salt")));
    }

    #[test]
    fn bad_gateway_host_is_rejected() {
        let mut config = RelayConfig::default();
        config.gateway.host = "not a host!".into();
        assert!(messages(&config).iter().any(|m| m.contains("gateway.host")));
    }
}
