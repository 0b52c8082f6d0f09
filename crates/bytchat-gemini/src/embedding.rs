// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query embeddings through Gemini `embedContent`.

use std::time::Duration;

use async_trait::async_trait;
use bytchat_config::model::{ProviderConfig, RetrievalConfig};
use bytchat_core::{AdapterType, BytchatError, EmbeddingAdapter, HealthStatus, PluginAdapter};
use tracing::{debug, info};

use crate::client::{GeminiClient, API_BASE_URL};

/// Embeds search queries with the model used at ingestion time.
pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(google: &ProviderConfig, retrieval: &RetrievalConfig) -> Result<Self, BytchatError> {
        let api_key = crate::require_key(google)?;
        let client = GeminiClient::new(
            api_key,
            google.base_url.as_deref().unwrap_or(API_BASE_URL),
            Duration::from_secs(google.timeout_secs),
        )?;
        info!(model = %retrieval.embedding_model, "Gemini embedder initialized");
        Ok(Self {
            client,
            model: retrieval.embedding_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PluginAdapter for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini-embedding"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, BytchatError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BytchatError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BytchatError> {
        let values = self
            .client
            .embed(&self.model, text)
            .await
            .map_err(|e| BytchatError::Embedding {
                message: format!("embedContent with {} failed", self.model),
                source: Some(Box::new(e)),
            })?;
        if values.is_empty() {
            return Err(BytchatError::Embedding {
                message: format!("{} returned an empty embedding", self.model),
                source: None,
            });
        }
        debug!(model = %self.model, dim = values.len(), "query embedded");
        Ok(values)
    }
}
