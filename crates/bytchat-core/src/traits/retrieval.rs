// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context retrieval seam used by the orchestrator.

use async_trait::async_trait;

/// Per-tenant semantic search over ingested document chunks.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Up to `k` chunk texts, most relevant first.
    ///
    /// Never fails: missing indexes, corrupted entries, and backend errors
    /// all collapse to fewer (possibly zero) results.
    async fn search(&self, tenant_id: i64, query: &str, k: usize) -> Vec<String>;
}
