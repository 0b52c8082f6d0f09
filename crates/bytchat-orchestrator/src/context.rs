// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use bytchat_core::ContextRetriever;

/// Retriever used when retrieval is switched off; every search is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

#[async_trait]
impl ContextRetriever for NoContext {
    async fn search(&self, _tenant_id: i64, _query: &str, _k: usize) -> Vec<String> {
        Vec::new()
    }
}
