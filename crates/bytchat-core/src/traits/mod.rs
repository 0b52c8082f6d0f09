// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter and collaborator trait definitions.
//!
//! Vendor-facing adapters extend [`PluginAdapter`]; persistence seams are
//! plain `Send + Sync` traits. All use `#[async_trait]` for dynamic dispatch.

pub mod adapter;
pub mod directory;
pub mod embedding;
pub mod provider;
pub mod retrieval;

pub use adapter::PluginAdapter;
pub use directory::BotDirectory;
pub use embedding::EmbeddingAdapter;
pub use provider::ProviderAdapter;
pub use retrieval::ContextRetriever;
