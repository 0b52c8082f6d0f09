// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with scripted responses and
//! counts how often each operation was called.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use bytchat_core::normalize::{apology, fallback_completion};
use bytchat_core::{
    AdapterType, BytchatError, Completion, CompletionUsage, FragmentStream, HealthStatus,
    PluginAdapter, PromptPackage, ProviderAdapter, ProviderKind, StreamFragment, UsageSource,
};

/// Scripted result of one buffered call.
#[derive(Debug, Clone)]
enum ScriptedCompletion {
    Measured {
        text: String,
        prompt_tokens: u32,
        completion_tokens: u32,
    },
    Failure,
}

/// A mock provider answering from FIFO scripts.
///
/// When a script queue is empty, streams yield `["mock ", "response"]` and
/// buffered calls return "mock response" with 10 prompt and 20 completion
/// tokens, measured.
pub struct MockProvider {
    kind: ProviderKind,
    name: String,
    streams: Arc<Mutex<VecDeque<Vec<StreamFragment>>>>,
    completions: Arc<Mutex<VecDeque<ScriptedCompletion>>>,
    prompts: Arc<Mutex<Vec<(PromptPackage, String)>>>,
    stream_calls: AtomicUsize,
    complete_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            name: kind.to_string(),
            streams: Arc::new(Mutex::new(VecDeque::new())),
            completions: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            stream_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
        }
    }

    /// Queue a stream that yields `parts` as text fragments.
    pub async fn push_stream(&self, parts: &[&str]) {
        let fragments = parts
            .iter()
            .map(|p| StreamFragment::Text(p.to_string()))
            .collect();
        self.streams.lock().await.push_back(fragments);
    }

    /// Queue a stream that yields `parts` and then fails.
    pub async fn push_failing_stream(&self, parts: &[&str]) {
        let mut fragments: Vec<_> = parts
            .iter()
            .map(|p| StreamFragment::Text(p.to_string()))
            .collect();
        fragments.push(StreamFragment::Error(apology(&self.name)));
        self.streams.lock().await.push_back(fragments);
    }

    /// Queue a successful buffered answer with measured usage.
    pub async fn push_completion(&self, text: &str, prompt_tokens: u32, completion_tokens: u32) {
        self.completions
            .lock()
            .await
            .push_back(ScriptedCompletion::Measured {
                text: text.to_string(),
                prompt_tokens,
                completion_tokens,
            });
    }

    /// Queue a failed buffered call (apology text, estimated usage).
    pub async fn push_completion_failure(&self) {
        self.completions
            .lock()
            .await
            .push_back(ScriptedCompletion::Failure);
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    /// Prompt and model of the most recent call of either kind.
    pub async fn last_prompt(&self) -> Option<(PromptPackage, String)> {
        self.prompts.lock().await.last().cloned()
    }

    async fn remember(&self, prompt: &PromptPackage, model: &str) {
        self.prompts
            .lock()
            .await
            .push((prompt.clone(), model.to_string()));
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BytchatError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BytchatError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn stream_completion(
        &self,
        prompt: &PromptPackage,
        model: &str,
        _temperature: f32,
    ) -> FragmentStream {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(prompt, model).await;
        let fragments = self.streams.lock().await.pop_front().unwrap_or_else(|| {
            vec![
                StreamFragment::Text("mock ".into()),
                StreamFragment::Text("response".into()),
            ]
        });
        Box::pin(stream::iter(fragments))
    }

    async fn complete_with_usage(
        &self,
        prompt: &PromptPackage,
        model: &str,
        _temperature: f32,
    ) -> Completion {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(prompt, model).await;
        let scripted = self.completions.lock().await.pop_front().unwrap_or(
            ScriptedCompletion::Measured {
                text: "mock response".into(),
                prompt_tokens: 10,
                completion_tokens: 20,
            },
        );
        match scripted {
            ScriptedCompletion::Measured {
                text,
                prompt_tokens,
                completion_tokens,
            } => Completion {
                text,
                usage: CompletionUsage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens.saturating_add(completion_tokens),
                    model_used: model.to_string(),
                    latency_ms: 5,
                    source: UsageSource::Measured,
                },
            },
            ScriptedCompletion::Failure => {
                fallback_completion(&self.name, prompt, model, Instant::now())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn scripts_are_consumed_in_order() {
        let provider = MockProvider::new(ProviderKind::OpenAi);
        provider.push_stream(&["a", "b"]).await;
        provider.push_completion("buffered", 3, 4).await;
        provider.push_completion_failure().await;
        let prompt = PromptPackage::new("sys", "q");

        let first: Vec<_> = provider
            .stream_completion(&prompt, "gpt-4o", 0.7)
            .await
            .collect()
            .await;
        assert_eq!(first.len(), 2);
        let default: Vec<_> = provider
            .stream_completion(&prompt, "gpt-4o", 0.7)
            .await
            .collect()
            .await;
        assert_eq!(default[1], StreamFragment::Text("response".into()));

        let ok = provider.complete_with_usage(&prompt, "gpt-4o", 0.7).await;
        assert_eq!(ok.usage.total_tokens, 7);
        let failed = provider.complete_with_usage(&prompt, "gpt-4o", 0.7).await;
        assert!(failed.usage.is_estimated());

        assert_eq!(provider.stream_calls(), 2);
        assert_eq!(provider.complete_calls(), 2);
        assert_eq!(provider.last_prompt().await.unwrap().1, "gpt-4o");
    }
}
