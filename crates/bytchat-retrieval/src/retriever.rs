// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cosine-similarity retriever over a tenant's chunk index.
//!
//! The query is embedded once, every chunk of the tenant is scored, chunks
//! under the similarity threshold are dropped, and the rest are returned
//! best-first, capped at `k`. Every failure path yields fewer results, never
//! an error.

use std::sync::Arc;

use async_trait::async_trait;
use bytchat_config::model::RetrievalConfig;
use bytchat_core::{ContextRetriever, EmbeddingAdapter};
use tracing::{debug, warn};

use crate::store::ChunkStore;
use crate::vector::{blob_to_vec, cosine_similarity};

/// Vector retriever backed by [`ChunkStore`] and an [`EmbeddingAdapter`].
pub struct VectorRetriever {
    store: ChunkStore,
    embedder: Arc<dyn EmbeddingAdapter>,
    similarity_threshold: f32,
}

impl VectorRetriever {
    pub fn new(store: ChunkStore, embedder: Arc<dyn EmbeddingAdapter>, config: &RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            similarity_threshold: config.similarity_threshold as f32,
        }
    }
}

#[async_trait]
impl ContextRetriever for VectorRetriever {
    async fn search(&self, tenant_id: i64, query: &str, k: usize) -> Vec<String> {
        if k == 0 {
            return Vec::new();
        }

        let chunks = match self.store.tenant_chunks(tenant_id).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(tenant_id, error = %e, "chunk index unreadable, continuing without context");
                return Vec::new();
            }
        };
        if chunks.is_empty() {
            debug!(tenant_id, "no chunk index for tenant");
            return Vec::new();
        }

        let query_vec = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(tenant_id, embedder = self.embedder.name(), error = %e, "query embedding failed, continuing without context");
                return Vec::new();
            }
        };

        let total = chunks.len();
        let mut scored: Vec<(f32, String)> = chunks
            .into_iter()
            .filter_map(|chunk| {
                let embedding = match blob_to_vec(&chunk.embedding) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(tenant_id, chunk_id = chunk.id, error = %e, "skipping corrupted chunk embedding");
                        return None;
                    }
                };
                let Some(similarity) = cosine_similarity(&query_vec, &embedding) else {
                    warn!(
                        tenant_id,
                        chunk_id = chunk.id,
                        chunk_dim = embedding.len(),
                        query_dim = query_vec.len(),
                        "skipping chunk with unusable embedding"
                    );
                    return None;
                };
                (similarity >= self.similarity_threshold).then_some((similarity, chunk.content))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(
            tenant_id,
            scanned = total,
            returned = scored.len(),
            top_score = scored.first().map(|s| s.0).unwrap_or(0.0),
            "context retrieved"
        );
        scored.into_iter().map(|(_, content)| content).collect()
    }
}
