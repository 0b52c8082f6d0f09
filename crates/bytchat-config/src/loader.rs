// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `/etc/bytchat/bytchat.toml`
//! 3. `~/.config/bytchat/bytchat.toml`
//! 4. `./bytchat.toml`
//! 5. Vendor key variables (`OPENAI_API_KEY`, `DEEPSEEK_API_KEY`, `GOOGLE_API_KEY`)
//! 6. `BYTCHAT_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BytchatConfig;

/// Top-level sections addressable from `BYTCHAT_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "service", "openai", "deepseek", "google", "storage", "retrieval", "quota", "metrics",
];

/// Conventional vendor variables accepted without the `BYTCHAT_` prefix.
const VENDOR_KEY_VARS: &[&str] = &["OPENAI_API_KEY", "DEEPSEEK_API_KEY", "GOOGLE_API_KEY"];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/bytchat/bytchat.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "bytchat.toml";

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bytchat/bytchat.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<BytchatConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<BytchatConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BytchatConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BytchatConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BytchatConfig::default()))
        .merge(Toml::file(path))
        .merge(vendor_env_provider())
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BytchatConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(vendor_env_provider())
        .merge(env_provider())
}

/// Maps `BYTCHAT_OPENAI_API_KEY` to `openai.api_key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys containing underscores (`database_path`) survive intact.
fn env_provider() -> Env {
    Env::prefixed("BYTCHAT_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        match key.split_once('_') {
            Some((section, rest)) if ENV_SECTIONS.contains(&section) => {
                format!("{section}.{rest}").into()
            }
            _ => key.into(),
        }
    })
}

/// Maps `OPENAI_API_KEY` style variables onto `<vendor>.api_key`.
fn vendor_env_provider() -> Env {
    Env::raw().only(VENDOR_KEY_VARS).map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        match key.strip_suffix("_api_key") {
            Some(vendor) => format!("{vendor}.api_key").into(),
            None => key.into(),
        }
    })
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn prefixed_env_maps_into_sections() {
        Jail::expect_with(|jail| {
            jail.set_env("BYTCHAT_STORAGE_DATABASE_PATH", "/tmp/jail.db");
            jail.set_env("BYTCHAT_QUOTA_EXPECTED_COMPLETION_TOKENS", "250");
            let config: BytchatConfig = Figment::new()
                .merge(Serialized::defaults(BytchatConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.storage.database_path, "/tmp/jail.db");
            assert_eq!(config.quota.expected_completion_tokens, 250);
            Ok(())
        });
    }

    #[test]
    fn vendor_key_vars_fill_credentials() {
        Jail::expect_with(|jail| {
            jail.set_env("DEEPSEEK_API_KEY", "sk-deep");
            jail.set_env("BYTCHAT_OPENAI_API_KEY", "sk-open");
            let config: BytchatConfig = Figment::new()
                .merge(Serialized::defaults(BytchatConfig::default()))
                .merge(vendor_env_provider())
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.deepseek.api_key.as_deref(), Some("sk-deep"));
            assert_eq!(config.openai.api_key.as_deref(), Some("sk-open"));
            assert_eq!(config.google.api_key, None);
            Ok(())
        });
    }

    #[test]
    fn prefixed_env_wins_over_vendor_var() {
        Jail::expect_with(|jail| {
            jail.set_env("GOOGLE_API_KEY", "from-vendor");
            jail.set_env("BYTCHAT_GOOGLE_API_KEY", "from-bytchat");
            let config: BytchatConfig = Figment::new()
                .merge(Serialized::defaults(BytchatConfig::default()))
                .merge(vendor_env_provider())
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.google.api_key.as_deref(), Some("from-bytchat"));
            Ok(())
        });
    }
}
