// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./flatrelay.toml` > `~/.config/flatrelay/flatrelay.toml` >
//! `/etc/flatrelay/flatrelay.toml`, with `FLATRELAY_*` environment overrides
//! applied last.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RelayConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/flatrelay/flatrelay.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "flatrelay.toml";

/// Sections that `FLATRELAY_<SECTION>_<KEY>` variables may address.
const ENV_SECTIONS: &[&str] = &[
    "relay", "discord", "feed", "poller", "commands", "storage", "vault", "gateway",
];

/// Per-user config file under the XDG config dir, if one can be located.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("flatrelay").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<RelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, then env overrides.
pub fn load_config_from_path(path: &Path) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping the first underscore after a known section
/// name to a dot. `FLATRELAY_DISCORD_BOT_TOKEN` becomes `discord.bot_token`.
fn env_provider() -> Env {
    Env::prefixed("FLATRELAY_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config key.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_at_section() {
        assert_eq!(map_env_key("discord_bot_token"), "discord.bot_token");
        assert_eq!(map_env_key("poller_per_user_delay_secs"), "poller.per_user_delay_secs");
        assert_eq!(map_env_key("vault_key"), "vault.key");
    }

    #[test]
    fn unknown_sections_pass_through() {
        assert_eq!(map_env_key("something_else"), "something_else");
    }
}
