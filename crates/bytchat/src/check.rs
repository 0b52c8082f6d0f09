// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bytchat check-config` command implementation.

use bytchat_config::BytchatConfig;
use bytchat_core::{BytchatError, ProviderKind};

/// Print a summary of the validated configuration and make sure the
/// database opens and migrates.
pub async fn run_check(config: &BytchatConfig) -> Result<(), BytchatError> {
    for line in summary(config) {
        println!("{line}");
    }

    let db = bytchat_storage::open(&config.storage).await?;
    db.ping().await?;
    println!("database: ok ({})", config.storage.database_path);
    Ok(())
}

fn summary(config: &BytchatConfig) -> Vec<String> {
    let mut lines = vec![format!("service: {} (log level {})", config.service.name, config.service.log_level)];

    for kind in [ProviderKind::OpenAi, ProviderKind::DeepSeek, ProviderKind::Google] {
        let section = config.provider(kind);
        let state = if section.enabled {
            format!(
                "enabled, max_tokens {}, timeout {}s{}",
                section.max_tokens,
                section.timeout_secs,
                section
                    .base_url
                    .as_deref()
                    .map(|url| format!(", base_url {url}"))
                    .unwrap_or_default()
            )
        } else {
            "disabled".to_string()
        };
        lines.push(format!("{kind}: {state}"));
    }

    let retrieval = &config.retrieval;
    lines.push(if retrieval.enabled {
        format!(
            "retrieval: top_k {}, threshold {}, model {}",
            retrieval.top_k, retrieval.similarity_threshold, retrieval.embedding_model
        )
    } else {
        "retrieval: disabled".to_string()
    });
    lines.push(format!(
        "quota: {} expected completion tokens, {}-day periods",
        config.quota.expected_completion_tokens, config.quota.period_days
    ));
    lines.push(format!(
        "metrics: {}",
        if config.metrics.enabled { "enabled" } else { "disabled" }
    ));
    lines
}
