// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Bytchat gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so typos in `bytchat.toml`
//! are rejected at startup instead of silently ignored.

use bytchat_core::ProviderKind;
use serde::{Deserialize, Serialize};

/// Top-level Bytchat configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BytchatConfig {
    /// Service identity, logging, and answer defaults.
    #[serde(default)]
    pub service: ServiceConfig,

    /// OpenAI chat-completions credentials.
    #[serde(default)]
    pub openai: ProviderConfig,

    /// DeepSeek credentials (OpenAI-compatible wire format).
    #[serde(default)]
    pub deepseek: ProviderConfig,

    /// Google Gemini credentials.
    #[serde(default)]
    pub google: ProviderConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Context retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Quota metering and plan presets.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl BytchatConfig {
    /// Credentials section for the given vendor.
    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::DeepSeek => &self.deepseek,
            ProviderKind::Google => &self.google,
        }
    }
}

/// Service identity and answer defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System prompt used when a bot has none of its own.
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,

    /// Sampling temperature passed to every provider.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            default_system_prompt: default_system_prompt(),
            temperature: default_temperature(),
        }
    }
}

fn default_service_name() -> String {
    "bytchat".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are an AI assistant named Bytchat, created by Bytcode. \
     You are helpful, smart, and a little creative."
        .to_string()
}

fn default_temperature() -> f32 {
    0.7
}

/// Credentials and limits for one LLM vendor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Disabled vendors are not constructed and need no credential.
    #[serde(default = "default_provider_enabled")]
    pub enabled: bool,

    /// API key. Required when `enabled` is true.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override for the vendor's public endpoint (proxies, tests).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Maximum tokens to generate per answer.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_provider_enabled(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider_enabled() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("bytchat").join("bytchat.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("bytchat.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Context retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// When false, prompts are never augmented with context.
    #[serde(default = "default_retrieval_enabled")]
    pub enabled: bool,

    /// Number of chunks requested per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity for a chunk to be used (-1.0 to 1.0).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Google embedding model used for query vectors. Must match the model
    /// used at ingestion time.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: default_retrieval_enabled(),
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            embedding_model: default_embedding_model(),
        }
    }
}

fn default_retrieval_enabled() -> bool {
    true
}

fn default_top_k() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.3
}

fn default_embedding_model() -> String {
    "embedding-001".to_string()
}

/// Quota metering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Completion tokens assumed when estimating a request before admission.
    #[serde(default = "default_expected_completion_tokens")]
    pub expected_completion_tokens: u32,

    /// Length of a billing period for newly created accounts.
    #[serde(default = "default_period_days")]
    pub period_days: u32,

    /// Plan presets keyed by tier.
    #[serde(default)]
    pub plans: PlanPresets,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            expected_completion_tokens: default_expected_completion_tokens(),
            period_days: default_period_days(),
            plans: PlanPresets::default(),
        }
    }
}

fn default_expected_completion_tokens() -> u32 {
    100
}

fn default_period_days() -> u32 {
    30
}

/// Presets for every plan tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlanPresets {
    #[serde(default = "free_plan")]
    pub free: PlanPreset,
    #[serde(default = "pro_plan")]
    pub pro: PlanPreset,
    #[serde(default = "enterprise_plan")]
    pub enterprise: PlanPreset,
}

impl Default for PlanPresets {
    fn default() -> Self {
        Self {
            free: free_plan(),
            pro: pro_plan(),
            enterprise: enterprise_plan(),
        }
    }
}

/// Allotment and overage terms for one plan tier.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlanPreset {
    /// Credits granted at the start of each period (1000 credits = $1).
    pub credits_included: u64,
    /// Monthly list price in cents.
    #[serde(default)]
    pub monthly_price_cents: u64,
    /// USD accrued per overage credit.
    pub overage_rate: f64,
    /// Declared overage ceiling in credits. Reported, not enforced.
    pub overage_cap: u64,
}

fn free_plan() -> PlanPreset {
    PlanPreset {
        credits_included: 2_000,
        monthly_price_cents: 0,
        overage_rate: 0.001,
        overage_cap: 1_000,
    }
}

fn pro_plan() -> PlanPreset {
    PlanPreset {
        credits_included: 13_000,
        monthly_price_cents: 2_000,
        overage_rate: 0.0012,
        overage_cap: 10_000,
    }
}

fn enterprise_plan() -> PlanPreset {
    PlanPreset {
        credits_included: 80_000,
        monthly_price_cents: 10_000,
        overage_rate: 0.0011,
        overage_cap: 50_000,
    }
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder at startup.
    #[serde(default)]
    pub enabled: bool,
}
