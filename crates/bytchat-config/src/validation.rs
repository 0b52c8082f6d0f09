// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.
//!
//! Every check runs; the caller receives the full list of problems at once.

use bytchat_core::ProviderKind;

use crate::diagnostic::ConfigError;
use crate::model::BytchatConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
pub fn validate_config(config: &BytchatConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(invalid("storage.database_path must not be empty"));
    }

    if !LOG_LEVELS.contains(&config.service.log_level.to_ascii_lowercase().as_str()) {
        errors.push(invalid(format!(
            "service.log_level `{}` is not one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    let temperature = config.service.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        errors.push(invalid(format!(
            "service.temperature must be between 0.0 and 2.0, got {temperature}"
        )));
    }

    for kind in [ProviderKind::OpenAi, ProviderKind::DeepSeek, ProviderKind::Google] {
        let section = config.provider(kind);
        if !section.enabled {
            continue;
        }
        let has_key = section
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        if !has_key {
            errors.push(ConfigError::MissingCredential {
                section: kind.to_string(),
                env_var: format!("{}_API_KEY", kind.to_string().to_ascii_uppercase()),
            });
        }
        if section.max_tokens == 0 {
            errors.push(invalid(format!("{kind}.max_tokens must be at least 1")));
        }
        if section.timeout_secs == 0 {
            errors.push(invalid(format!("{kind}.timeout_secs must be at least 1")));
        }
    }

    let retrieval = &config.retrieval;
    if retrieval.enabled {
        if retrieval.top_k == 0 {
            errors.push(invalid("retrieval.top_k must be at least 1 when retrieval is enabled"));
        }
        if !config.google.enabled {
            errors.push(invalid(
                "retrieval.enabled requires the google provider for query embeddings; \
                 enable [google] or set retrieval.enabled = false",
            ));
        }
    }
    if !(-1.0..=1.0).contains(&retrieval.similarity_threshold) {
        errors.push(invalid(format!(
            "retrieval.similarity_threshold must be between -1.0 and 1.0, got {}",
            retrieval.similarity_threshold
        )));
    }

    for (tier, preset) in [
        ("free", &config.quota.plans.free),
        ("pro", &config.quota.plans.pro),
        ("enterprise", &config.quota.plans.enterprise),
    ] {
        if preset.overage_rate < 0.0 || !preset.overage_rate.is_finite() {
            errors.push(invalid(format!(
                "quota.plans.{tier}.overage_rate must be a non-negative number, got {}",
                preset.overage_rate
            )));
        }
    }

    if config.quota.period_days == 0 {
        errors.push(invalid("quota.period_days must be at least 1"));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_keys() -> BytchatConfig {
        let mut config = BytchatConfig::default();
        config.storage.database_path = "/tmp/bytchat.db".into();
        config.openai.api_key = Some("sk-openai".into());
        config.deepseek.api_key = Some("sk-deepseek".into());
        config.google.api_key = Some("g-key".into());
        config
    }

    #[test]
    fn keyed_defaults_are_valid() {
        assert!(validate_config(&with_keys()).is_ok());
    }

    #[test]
    fn missing_credentials_are_all_reported() {
        let mut config = with_keys();
        config.openai.api_key = None;
        config.google.api_key = Some("   ".into());
        let errors = validate_config(&config).unwrap_err();
        let missing: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                ConfigError::MissingCredential { section, .. } => Some(section.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(missing, vec!["openai", "google"]);
    }

    #[test]
    fn disabled_provider_needs_no_key() {
        let mut config = with_keys();
        config.deepseek.enabled = false;
        config.deepseek.api_key = None;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn retrieval_requires_google() {
        let mut config = with_keys();
        config.google.enabled = false;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("google"));

        config.retrieval.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn range_checks_collect_every_error() {
        let mut config = with_keys();
        config.service.temperature = 3.5;
        config.service.log_level = "loud".into();
        config.retrieval.similarity_threshold = 1.5;
        config.retrieval.top_k = 0;
        config.quota.plans.pro.overage_rate = -1.0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
    }
}
