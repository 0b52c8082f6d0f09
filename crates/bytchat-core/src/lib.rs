// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Bytchat gateway.
//!
//! This crate provides the trait definitions, error type, and request types
//! shared across the workspace. Provider adapters, the context retriever, and
//! the bot directory all implement traits defined here.

pub mod error;
pub mod normalize;
pub mod outcome;
pub mod tokens;
pub mod traits;
pub mod types;

pub use error::BytchatError;
pub use outcome::{DegradeReason, FailureKind, Outcome};
pub use tokens::estimate_tokens;
pub use types::{
    AdapterType, BotConfig, Completion, CompletionUsage, FragmentStream, HealthStatus,
    OwnerIdentity, PromptPackage, ProviderKind, RosterEntry, StreamFragment, TaskType,
    UsageSource,
};

pub use traits::{BotDirectory, ContextRetriever, EmbeddingAdapter, PluginAdapter, ProviderAdapter};
