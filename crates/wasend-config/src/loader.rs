// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./wasend.toml` > `~/.config/wasend/wasend.toml` >
//! `/etc/wasend/wasend.toml`, then `WASEND_*` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WasendConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/wasend/wasend.toml";

/// Local configuration file, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "wasend.toml";

/// Sections recognised by the env var mapper, longest-prefix safe.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "gateway",
    "bridge",
    "dispatch",
    "webhook",
    "reconnect",
    "prometheus",
];

/// Per-user configuration file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wasend").join(LOCAL_CONFIG_FILE))
}

/// Build the layered Figment (exposed for diagnostics and `wasend config`).
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wasend/wasend.toml`
/// 3. `~/.config/wasend/wasend.toml`
/// 4. `./wasend.toml`
/// 5. `WASEND_*` environment variables
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WasendConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<WasendConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<WasendConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WasendConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file, still honouring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<WasendConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WasendConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `WASEND_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `WASEND_DISPATCH_SEND_TIMEOUT_SECS` maps to `dispatch.send_timeout_secs`.
fn env_provider() -> Env {
    Env::prefixed("WASEND_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("gateway_bearer_token"), "gateway.bearer_token");
        assert_eq!(
            map_env_key("dispatch_send_timeout_secs"),
            "dispatch.send_timeout_secs"
        );
        assert_eq!(map_env_key("webhook_url"), "webhook.url");
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
        assert_eq!(map_env_key("BRIDGE_BASE_URL"), "bridge.base_url");
    }

    #[test]
    fn section_prefix_needs_separator() {
        // "gatewayx_port" is not the gateway section.
        assert_eq!(map_env_key("gatewayx_port"), "gatewayx_port");
    }
}
