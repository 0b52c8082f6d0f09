// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for query vectorization.

use async_trait::async_trait;

use crate::error::BytchatError;
use crate::traits::adapter::PluginAdapter;

/// Converts text into a dense vector comparable with the chunk index.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BytchatError>;
}
