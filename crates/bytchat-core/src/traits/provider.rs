// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for LLM vendors (OpenAI, DeepSeek, Google).

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;
use crate::types::{Completion, FragmentStream, PromptPackage, ProviderKind};

/// Uniform streaming and buffered access to one LLM vendor.
///
/// Neither operation fails: transport and API errors are normalized into
/// user-safe text (see [`crate::normalize`]).
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Vendor served by this adapter; used to match roster entries.
    fn kind(&self) -> ProviderKind;

    /// Stream the answer fragment by fragment.
    ///
    /// On failure the stream carries exactly one
    /// [`StreamFragment::Error`](crate::types::StreamFragment::Error) and ends.
    /// Dropping the stream closes the underlying connection.
    async fn stream_completion(
        &self,
        prompt: &PromptPackage,
        model: &str,
        temperature: f32,
    ) -> FragmentStream;

    /// Fetch the whole answer together with token usage.
    ///
    /// On failure returns an apology with heuristic usage tagged
    /// [`UsageSource::Estimated`](crate::types::UsageSource::Estimated).
    async fn complete_with_usage(
        &self,
        prompt: &PromptPackage,
        model: &str,
        temperature: f32,
    ) -> Completion;
}
