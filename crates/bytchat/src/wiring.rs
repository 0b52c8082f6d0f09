// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Composition root: builds adapters from configuration and wires the
//! request orchestrator.

use std::sync::Arc;

use bytchat_config::BytchatConfig;
use bytchat_core::{BytchatError, ContextRetriever, ProviderAdapter};
use bytchat_orchestrator::{NoContext, PipelineSettings, RequestOrchestrator};
use bytchat_quota::QuotaLedger;
use bytchat_storage::{Database, SqliteBotDirectory};
use tracing::{info, warn};

#[cfg(feature = "openai")]
use bytchat_openai::OpenAiCompatProvider;

#[cfg(feature = "gemini")]
use bytchat_gemini::{GeminiEmbedder, GeminiProvider};

#[cfg(feature = "gemini")]
use bytchat_retrieval::{ChunkStore, VectorRetriever};

/// Everything a command needs to serve queries.
pub struct Runtime {
    pub db: Database,
    pub orchestrator: RequestOrchestrator,
    #[cfg(feature = "prometheus")]
    pub metrics: Option<bytchat_prometheus::PrometheusAdapter>,
}

/// Open storage and build every enabled adapter.
pub async fn build(config: &BytchatConfig) -> Result<Runtime, BytchatError> {
    #[cfg(feature = "prometheus")]
    let metrics = if config.metrics.enabled {
        Some(bytchat_prometheus::PrometheusAdapter::new()?)
    } else {
        None
    };
    #[cfg(not(feature = "prometheus"))]
    if config.metrics.enabled {
        warn!("metrics.enabled is set but bytchat was built without the prometheus feature");
    }

    let db = bytchat_storage::open(&config.storage).await?;
    info!(path = %config.storage.database_path, "database opened");

    let providers = build_providers(config)?;
    if providers.is_empty() {
        warn!("no provider adapters enabled; every query will get an apology");
    }

    let orchestrator = RequestOrchestrator::new(
        Arc::new(SqliteBotDirectory::new(db.clone())),
        build_retriever(config, &db)?,
        providers,
        Arc::new(QuotaLedger::new(db.connection().clone(), &config.quota)),
        PipelineSettings::from_config(config),
    );

    Ok(Runtime {
        db,
        orchestrator,
        #[cfg(feature = "prometheus")]
        metrics,
    })
}

fn build_providers(config: &BytchatConfig) -> Result<Vec<Arc<dyn ProviderAdapter>>, BytchatError> {
    let mut providers: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    #[cfg(feature = "openai")]
    for kind in [bytchat_core::ProviderKind::OpenAi, bytchat_core::ProviderKind::DeepSeek] {
        if config.provider(kind).enabled {
            providers.push(Arc::new(OpenAiCompatProvider::from_config(config, kind)?));
            info!(provider = %kind, "provider initialized");
        }
    }
    #[cfg(not(feature = "openai"))]
    if config.openai.enabled || config.deepseek.enabled {
        warn!("openai/deepseek enabled but bytchat was built without the openai feature");
    }

    #[cfg(feature = "gemini")]
    if config.google.enabled {
        providers.push(Arc::new(GeminiProvider::new(&config.google)?));
        info!(provider = "google", "provider initialized");
    }
    #[cfg(not(feature = "gemini"))]
    if config.google.enabled {
        warn!("google enabled but bytchat was built without the gemini feature");
    }

    Ok(providers)
}

#[cfg_attr(not(feature = "gemini"), allow(unused_variables))]
fn build_retriever(
    config: &BytchatConfig,
    db: &Database,
) -> Result<Arc<dyn ContextRetriever>, BytchatError> {
    if !config.retrieval.enabled {
        info!("retrieval disabled; prompts are not augmented");
        return Ok(Arc::new(NoContext));
    }

    #[cfg(feature = "gemini")]
    {
        let embedder = Arc::new(GeminiEmbedder::new(&config.google, &config.retrieval)?);
        info!(model = %embedder.model(), top_k = config.retrieval.top_k, "retrieval enabled");
        Ok(Arc::new(VectorRetriever::new(
            ChunkStore::new(db.connection().clone()),
            embedder,
            &config.retrieval,
        )))
    }

    #[cfg(not(feature = "gemini"))]
    {
        warn!("retrieval needs the gemini feature for query embeddings; continuing without context");
        Ok(Arc::new(NoContext))
    }
}
