// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The end-to-end query pipeline.
//!
//! Every request walks the same stages (see [`RequestStage`]). Stages report
//! an [`Outcome`]: degraded stages let the request continue, fatal ones end it
//! with a single user-facing fragment. Nothing here returns an error to the
//! caller.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use bytchat_config::BytchatConfig;
use bytchat_core::normalize::apology;
use bytchat_core::{
    estimate_tokens, BotConfig, BotDirectory, ContextRetriever, DegradeReason, FailureKind,
    Outcome, OwnerIdentity, PromptPackage, ProviderAdapter, ProviderKind, RosterEntry,
    StreamFragment,
};
use bytchat_quota::QuotaLedger;
use bytchat_router::{ModelRouter, RoutingDecision};
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::prompt::build_prompt;
use crate::stage::{DeliveryPath, RequestStage};
use crate::telemetry;

/// Lazy sequence of answer text handed to the transport layer.
pub type AnswerStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Per-service knobs the pipeline needs from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_system_prompt: String,
    pub temperature: f32,
    /// Chunks requested from the retriever.
    pub top_k: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &BytchatConfig) -> Self {
        Self {
            default_system_prompt: config.service.default_system_prompt.clone(),
            temperature: config.service.temperature,
            top_k: config.retrieval.top_k,
        }
    }
}

/// Shared collaborators; one instance serves every request.
struct Pipeline {
    directory: Arc<dyn BotDirectory>,
    retriever: Arc<dyn ContextRetriever>,
    router: ModelRouter,
    providers: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
    ledger: Arc<QuotaLedger>,
    settings: PipelineSettings,
}

/// Turns a query for a bot into a stream of answer text.
///
/// Cheap to clone; clones share the same collaborators.
#[derive(Clone)]
pub struct RequestOrchestrator {
    pipeline: Arc<Pipeline>,
}

impl RequestOrchestrator {
    /// Wire the pipeline. Providers are keyed by [`ProviderAdapter::kind`];
    /// a later adapter for the same kind replaces an earlier one.
    pub fn new(
        directory: Arc<dyn BotDirectory>,
        retriever: Arc<dyn ContextRetriever>,
        providers: Vec<Arc<dyn ProviderAdapter>>,
        ledger: Arc<QuotaLedger>,
        settings: PipelineSettings,
    ) -> Self {
        let providers: HashMap<_, _> = providers.into_iter().map(|p| (p.kind(), p)).collect();
        let mut kinds: Vec<_> = providers.keys().map(ToString::to_string).collect();
        kinds.sort();
        info!(
            providers = %kinds.join(","),
            top_k = settings.top_k,
            temperature = settings.temperature,
            "request orchestrator initialized"
        );

        Self {
            pipeline: Arc::new(Pipeline {
                directory,
                retriever,
                router: ModelRouter::new(),
                providers,
                ledger,
                settings,
            }),
        }
    }

    /// Answer `query` on behalf of `owner` using bot `bot_id`.
    ///
    /// The returned stream is lazy: no stage runs until it is first polled,
    /// and dropping it cancels whatever stage is in flight. Tracked owners
    /// with `track_metrics` set are metered and billed; everyone else is
    /// streamed unbilled.
    pub fn handle_query(
        &self,
        owner: OwnerIdentity,
        bot_id: i64,
        query: impl Into<String>,
        track_metrics: bool,
    ) -> AnswerStream {
        let pipeline = Arc::clone(&self.pipeline);
        let query = query.into();
        Box::pin(
            stream::once(async move { pipeline.run(owner, bot_id, query, track_metrics).await })
                .flatten(),
        )
    }
}

impl Pipeline {
    async fn run(
        &self,
        owner: OwnerIdentity,
        bot_id: i64,
        query: String,
        track_metrics: bool,
    ) -> AnswerStream {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(request_id = %request_id, owner = %owner, bot_id, track_metrics, "query received");

        let bot = match self.load_bot(&request_id, bot_id).await {
            Ok(bot) => bot,
            Err(kind) => return single(kind.user_message()),
        };

        let context = self
            .retrieve_context(&request_id, bot_id, &query)
            .await
            .ok()
            .unwrap_or_default();

        debug!(
            request_id = %request_id,
            stage = %RequestStage::BuildPrompt,
            context_chunks = context.len(),
            "building prompt"
        );
        let prompt = build_prompt(&bot, &self.settings.default_system_prompt, &query, &context);

        let decision = match self.select_model(&request_id, &query, &bot) {
            Ok(decision) => decision,
            Err(kind) => return single(kind.user_message()),
        };
        let entry = decision.entry;

        if let Some(owner_id) = owner.tracked_id().filter(|_| track_metrics) {
            match self.metered(&request_id, owner_id, bot_id, &entry, &prompt).await {
                Outcome::Ok(text) => {
                    telemetry::query_handled(DeliveryPath::Metered);
                    debug!(request_id = %request_id, stage = %RequestStage::Emit, path = "metered", "emitting answer");
                    return single(text);
                }
                Outcome::Fatal(kind) => return single(kind.user_message()),
                Outcome::Degraded(reason) => {
                    warn!(
                        request_id = %request_id,
                        provider = %entry.provider,
                        model = %entry.model_id,
                        reason = %reason,
                        "metered call failed; falling back to streaming"
                    );
                    telemetry::provider_fallback(&entry.provider.to_string());
                }
            }
        }

        self.streaming(&request_id, &entry, &prompt).await
    }

    async fn load_bot(&self, request_id: &str, bot_id: i64) -> Result<BotConfig, FailureKind> {
        match self.directory.bot_config(bot_id).await {
            Ok(Some(bot)) => Ok(bot),
            Ok(None) => {
                info!(request_id = %request_id, bot_id, "bot not found");
                Err(FailureKind::BotNotFound)
            }
            Err(e) => {
                warn!(request_id = %request_id, bot_id, error = %e, "bot lookup failed");
                Err(FailureKind::BotNotFound)
            }
        }
    }

    async fn retrieve_context(
        &self,
        request_id: &str,
        bot_id: i64,
        query: &str,
    ) -> Outcome<Vec<String>> {
        let chunks = self
            .retriever
            .search(bot_id, query, self.settings.top_k)
            .await;
        if chunks.is_empty() {
            debug!(
                request_id = %request_id,
                stage = %RequestStage::RetrieveContext,
                bot_id,
                "no context found; answering without augmentation"
            );
            return Outcome::Degraded(DegradeReason::RetrievalDegraded);
        }
        debug!(
            request_id = %request_id,
            stage = %RequestStage::RetrieveContext,
            bot_id,
            chunks = chunks.len(),
            "context retrieved"
        );
        Outcome::Ok(chunks)
    }

    fn select_model(
        &self,
        request_id: &str,
        query: &str,
        bot: &BotConfig,
    ) -> Result<RoutingDecision, FailureKind> {
        self.router.select(query, &bot.roster).map_err(|e| {
            warn!(
                request_id = %request_id,
                stage = %RequestStage::SelectModel,
                bot_id = bot.bot_id,
                error = %e,
                "model selection failed"
            );
            FailureKind::NoModelAvailable
        })
    }

    /// Admission, buffered call, and billing.
    ///
    /// `Ok` carries the billed answer to emit, `Fatal` ends the request,
    /// and `Degraded(ProviderCallFailed)` asks the caller to stream instead.
    async fn metered(
        &self,
        request_id: &str,
        owner_id: i64,
        bot_id: i64,
        entry: &RosterEntry,
        prompt: &PromptPackage,
    ) -> Outcome<String> {
        let prompt_tokens =
            estimate_tokens(&prompt.system_prompt).saturating_add(estimate_tokens(&prompt.user_question));

        let admission = match self
            .ledger
            .estimate_request(entry.provider, &entry.model_id, prompt_tokens)
            .await
        {
            Ok(estimated) => self
                .ledger
                .check_admission(owner_id, estimated)
                .await
                .map(|admission| (estimated, admission)),
            Err(e) => Err(e),
        };

        // A ledger we cannot read must not hand out free answers.
        let (estimated, admission) = match admission {
            Ok(pair) => pair,
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    stage = %RequestStage::AdmitCheck,
                    owner_id,
                    error = %e,
                    "admission check failed"
                );
                return Outcome::Fatal(FailureKind::BillingUnavailable);
            }
        };

        if !admission.allowed {
            info!(
                request_id = %request_id,
                stage = %RequestStage::AdmitCheck,
                owner_id,
                estimated_credits = estimated,
                "quota exceeded"
            );
            telemetry::quota_denied();
            return Outcome::Fatal(FailureKind::QuotaExceeded);
        }
        if admission.will_overage {
            debug!(
                request_id = %request_id,
                owner_id,
                overage_credits = admission.overage_credits,
                "request admitted into overage"
            );
        }

        let Some(provider) = self.providers.get(&entry.provider) else {
            warn!(
                request_id = %request_id,
                stage = %RequestStage::CallProvider,
                provider = %entry.provider,
                "no adapter configured for routed provider"
            );
            return Outcome::Degraded(DegradeReason::ProviderCallFailed);
        };

        debug!(
            request_id = %request_id,
            stage = %RequestStage::CallProvider,
            path = "metered",
            provider = %entry.provider,
            model = %entry.model_id,
            "calling provider"
        );
        let completion = provider
            .complete_with_usage(prompt, &entry.model_id, self.settings.temperature)
            .await;
        if completion.usage.is_estimated() {
            return Outcome::Degraded(DegradeReason::ProviderCallFailed);
        }

        match self
            .ledger
            .record_usage(owner_id, bot_id, entry.provider, &completion.usage)
            .await
        {
            Ok(record) => {
                debug!(
                    request_id = %request_id,
                    stage = %RequestStage::RecordUsage,
                    record_id = %record.id,
                    charged_credits = record.charged_credits,
                    "usage recorded"
                );
                telemetry::usage_billed(
                    &entry.provider.to_string(),
                    record.charged_credits,
                    completion.usage.latency_ms,
                );
            }
            Err(e) => {
                // Deliver anyway; the unbilled call is reconciled offline.
                warn!(
                    request_id = %request_id,
                    stage = %RequestStage::RecordUsage,
                    reason = %DegradeReason::LedgerWriteFailed,
                    owner_id,
                    bot_id,
                    provider = %entry.provider,
                    model = %completion.usage.model_used,
                    prompt_tokens = completion.usage.prompt_tokens,
                    completion_tokens = completion.usage.completion_tokens,
                    error = %e,
                    "usage not recorded; needs reconciliation"
                );
                telemetry::ledger_failed();
            }
        }

        Outcome::Ok(completion.text)
    }

    async fn streaming(
        &self,
        request_id: &str,
        entry: &RosterEntry,
        prompt: &PromptPackage,
    ) -> AnswerStream {
        telemetry::query_handled(DeliveryPath::Streaming);
        let Some(provider) = self.providers.get(&entry.provider) else {
            warn!(
                request_id = %request_id,
                stage = %RequestStage::CallProvider,
                provider = %entry.provider,
                "no adapter configured for routed provider"
            );
            return single(apology(&entry.provider.to_string()));
        };

        debug!(
            request_id = %request_id,
            stage = %RequestStage::CallProvider,
            path = "streaming",
            provider = %entry.provider,
            model = %entry.model_id,
            "calling provider"
        );
        let fragments = provider
            .stream_completion(prompt, &entry.model_id, self.settings.temperature)
            .await;

        debug!(request_id = %request_id, stage = %RequestStage::Emit, path = "streaming", "emitting answer");
        Box::pin(fragments.map(StreamFragment::into_text))
    }
}

/// A stream of exactly one fragment.
fn single(text: impl Into<String>) -> AnswerStream {
    Box::pin(stream::iter(Some(text.into())))
}
