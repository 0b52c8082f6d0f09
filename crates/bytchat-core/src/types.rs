// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the routing, provider, quota, and orchestration layers.

use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    Storage,
    Observability,
}

/// LLM vendor behind a roster entry.
///
/// OpenAI and DeepSeek share the chat-completions wire format; Google is
/// served by the Gemini API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[strum(to_string = "openai")]
    OpenAi,
    #[strum(to_string = "deepseek")]
    DeepSeek,
    #[strum(to_string = "google", serialize = "gemini")]
    Google,
}

/// Task tag attached to a roster entry.
///
/// Unknown tags coming from storage are kept verbatim in [`TaskType::Other`];
/// they never match a keyword route but still count as active entries for the
/// sole-entry fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskType {
    Simple,
    General,
    Complex,
    Other(String),
}

impl TaskType {
    /// Parse a stored tag, case-insensitively.
    pub fn parse(tag: &str) -> Self {
        let lower = tag.trim().to_lowercase();
        match lower.as_str() {
            "simple" => TaskType::Simple,
            "general" => TaskType::General,
            "complex" => TaskType::Complex,
            _ => TaskType::Other(lower),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskType::Simple => "simple",
            TaskType::General => "general",
            TaskType::Complex => "complex",
            TaskType::Other(tag) => tag,
        }
    }

    /// True for tags served by the non-complex route.
    pub fn is_general_route(&self) -> bool {
        matches!(self, TaskType::Simple | TaskType::General)
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{provider, model, task_type, active}` row of a bot's roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub task_type: TaskType,
    pub provider: ProviderKind,
    pub model_id: String,
    pub active: bool,
}

impl RosterEntry {
    pub fn new(task_type: TaskType, provider: ProviderKind, model_id: impl Into<String>) -> Self {
        Self {
            task_type,
            provider,
            model_id: model_id.into(),
            active: true,
        }
    }

    /// Builder-style toggle used mostly by tests and fixtures.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Per-bot configuration loaded from the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub bot_id: i64,
    pub name: String,
    /// Overrides the service-wide default prompt when set.
    pub system_prompt: Option<String>,
    /// Ordered roster; order is the tie-break for routing.
    pub roster: Vec<RosterEntry>,
}

/// System prompt plus user question handed to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPackage {
    pub system_prompt: String,
    pub user_question: String,
}

impl PromptPackage {
    pub fn new(system_prompt: impl Into<String>, user_question: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_question: user_question.into(),
        }
    }
}

/// Who is asking. Only tracked owners can be metered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerIdentity {
    /// Registered account with a numeric id.
    Tracked(i64),
    /// Anonymous visitor identified by an opaque token.
    Anonymous(String),
}

impl OwnerIdentity {
    pub fn tracked_id(&self) -> Option<i64> {
        match self {
            OwnerIdentity::Tracked(id) => Some(*id),
            OwnerIdentity::Anonymous(_) => None,
        }
    }
}

impl std::fmt::Display for OwnerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnerIdentity::Tracked(id) => write!(f, "owner:{id}"),
            OwnerIdentity::Anonymous(token) => write!(f, "anon:{token}"),
        }
    }
}

/// Whether token counts came from the provider or from the word heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UsageSource {
    Measured,
    Estimated,
}

/// Token accounting for one buffered provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub model_used: String,
    pub latency_ms: u64,
    pub source: UsageSource,
}

impl CompletionUsage {
    pub fn is_estimated(&self) -> bool {
        self.source == UsageSource::Estimated
    }
}

/// A fully buffered provider answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: CompletionUsage,
}

/// One element of a streamed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFragment {
    /// Incremental answer text.
    Text(String),
    /// User-safe error text; always the last fragment of its stream.
    Error(String),
}

impl StreamFragment {
    pub fn is_error(&self) -> bool {
        matches!(self, StreamFragment::Error(_))
    }

    pub fn into_text(self) -> String {
        match self {
            StreamFragment::Text(text) | StreamFragment::Error(text) => text,
        }
    }
}

/// Lazy, single-consumer sequence of answer fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = StreamFragment> + Send>>;
