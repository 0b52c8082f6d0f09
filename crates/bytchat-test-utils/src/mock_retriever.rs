// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-result context retriever.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytchat_core::ContextRetriever;

/// Returns the same chunks for every tenant, truncated to `k`.
#[derive(Default)]
pub struct MockRetriever {
    chunks: Vec<String>,
    calls: AtomicUsize,
}

impl MockRetriever {
    /// A retriever that never finds anything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextRetriever for MockRetriever {
    async fn search(&self, _tenant_id: i64, _query: &str, k: usize) -> Vec<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.chunks.iter().take(k).cloned().collect()
    }
}
