// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider adapter for the Bytchat gateway.
//!
//! OpenAI and DeepSeek share the chat-completions wire format, so one adapter
//! type serves both; the [`ProviderKind`] picks the default endpoint and the
//! name used in logs and user-facing apologies.

pub mod client;
pub mod sse;
pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytchat_config::model::ProviderConfig;
use bytchat_config::BytchatConfig;
use bytchat_core::normalize::{fallback_completion, guard_stream};
use bytchat_core::{
    AdapterType, BytchatError, Completion, CompletionUsage, FragmentStream, HealthStatus,
    PluginAdapter, PromptPackage, ProviderAdapter, ProviderKind, UsageSource,
};
use tracing::{debug, info, warn};

use crate::client::ChatClient;
use crate::types::{ChatMessage, ChatRequest};

/// Public OpenAI endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Public DeepSeek endpoint.
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Chat-completions provider implementing [`ProviderAdapter`].
pub struct OpenAiCompatProvider {
    kind: ProviderKind,
    name: String,
    client: ChatClient,
    max_tokens: u32,
}

impl OpenAiCompatProvider {
    /// Creates the adapter for `kind` from its credentials section.
    ///
    /// Fails if the section has no API key or `kind` is not a
    /// chat-completions vendor.
    pub fn new(kind: ProviderKind, config: &ProviderConfig) -> Result<Self, BytchatError> {
        let default_base = match kind {
            ProviderKind::OpenAi => OPENAI_BASE_URL,
            ProviderKind::DeepSeek => DEEPSEEK_BASE_URL,
            ProviderKind::Google => {
                return Err(BytchatError::Config(
                    "google is served by the Gemini adapter, not chat-completions".into(),
                ));
            }
        };
        let base_url = config.base_url.as_deref().unwrap_or(default_base);
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BytchatError::Config(format!("missing {kind}.api_key")))?;

        let client = ChatClient::new(api_key, base_url, Duration::from_secs(config.timeout_secs))?;
        info!(provider = %kind, endpoint = client.endpoint(), "chat-completions provider initialized");

        Ok(Self {
            kind,
            name: kind.to_string(),
            client,
            max_tokens: config.max_tokens,
        })
    }

    /// Creates the adapter from the matching section of the full configuration.
    pub fn from_config(config: &BytchatConfig, kind: ProviderKind) -> Result<Self, BytchatError> {
        Self::new(kind, config.provider(kind))
    }

    fn chat_request(&self, prompt: &PromptPackage, model: &str, temperature: f32) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(&prompt.system_prompt),
                ChatMessage::user(&prompt.user_question),
            ],
            temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }

    async fn try_complete(
        &self,
        request: &ChatRequest,
        started: Instant,
    ) -> Result<Completion, BytchatError> {
        let response = self.client.complete_chat(request).await?;
        let usage = response
            .usage
            .ok_or_else(|| BytchatError::provider("response carried no token usage"))?;
        debug!(
            provider = %self.kind,
            requested = %request.model,
            served = response.model.as_deref().unwrap_or("unknown"),
            "buffered completion received"
        );
        Ok(Completion {
            text: response.text(),
            usage: CompletionUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage
                    .total_tokens
                    .unwrap_or(usage.prompt_tokens.saturating_add(usage.completion_tokens)),
                // Billing keys on the roster's model id, not the dated alias the vendor echoes.
                model_used: request.model.clone(),
                latency_ms: started.elapsed().as_millis() as u64,
                source: UsageSource::Measured,
            },
        })
    }
}

#[async_trait]
impl PluginAdapter for OpenAiCompatProvider {
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
        // Probing the API would spend tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BytchatError> {
        debug!(provider = %self.kind, "chat-completions provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn stream_completion(
        &self,
        prompt: &PromptPackage,
        model: &str,
        temperature: f32,
    ) -> FragmentStream {
        let request = self.chat_request(prompt, model, temperature);
        guard_stream(&self.name, self.client.stream_chat(&request).await)
    }

    async fn complete_with_usage(
        &self,
        prompt: &PromptPackage,
        model: &str,
        temperature: f32,
    ) -> Completion {
        let started = Instant::now();
        let request = self.chat_request(prompt, model, temperature);
        match self.try_complete(&request, started).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(provider = %self.kind, model, error = %e, "buffered completion failed");
                fallback_completion(&self.name, prompt, model, started)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytchat_core::StreamFragment;
    use futures::StreamExt;
    use tracing_test::traced_test;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider(kind: ProviderKind, server: &MockServer) -> OpenAiCompatProvider {
        let config = ProviderConfig {
            api_key: Some("sk-test".into()),
            base_url: Some(format!("{}/v1", server.uri())),
            max_tokens: 64,
            timeout_secs: 5,
            ..ProviderConfig::default()
        };
        OpenAiCompatProvider::new(kind, &config).unwrap()
    }

    fn prompt() -> PromptPackage {
        PromptPackage::new("You are a helpful assistant.", "What is the capital of France?")
    }

    #[test]
    fn missing_key_fails_fast() {
        let err = OpenAiCompatProvider::new(ProviderKind::DeepSeek, &ProviderConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("deepseek.api_key"));
    }

    #[test]
    fn google_is_rejected() {
        let config = ProviderConfig {
            api_key: Some("k".into()),
            ..ProviderConfig::default()
        };
        assert!(OpenAiCompatProvider::new(ProviderKind::Google, &config).is_err());
    }

    #[test]
    fn deepseek_defaults_to_its_endpoint() {
        let config = ProviderConfig {
            api_key: Some("k".into()),
            ..ProviderConfig::default()
        };
        let provider = OpenAiCompatProvider::new(ProviderKind::DeepSeek, &config).unwrap();
        assert_eq!(provider.name(), "deepseek");
        assert_eq!(provider.client.endpoint(), "https://api.deepseek.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn stream_yields_text_fragments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-chat",
                "stream": true,
                "max_tokens": 64,
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "What is the capital of France?"}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(concat!(
                        "data: {\"choices\":[{\"delta\":{\"content\":\"Par\"}}]}\n\n",
                        "data: {\"choices\":[{\"delta\":{\"content\":\"is\"}}]}\n\n",
                        "data: [DONE]\n\n"
                    )),
            )
            .mount(&server)
            .await;

        let fragments: Vec<_> = provider(ProviderKind::DeepSeek, &server)
            .stream_completion(&prompt(), "deepseek-chat", 0.7)
            .await
            .collect()
            .await;
        assert_eq!(
            fragments,
            vec![
                StreamFragment::Text("Par".into()),
                StreamFragment::Text("is".into())
            ]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn stream_failure_is_one_error_fragment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let fragments: Vec<_> = provider(ProviderKind::OpenAi, &server)
            .stream_completion(&prompt(), "gpt-4o", 0.7)
            .await
            .collect()
            .await;
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].is_error());
        assert!(fragments[0].clone().into_text().contains("openai"));
        assert!(logs_contain("provider stream failed to open"));
    }

    #[tokio::test]
    async fn buffered_success_reports_measured_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-4o-2024-08-06",
                "choices": [{"message": {"role": "assistant", "content": "Paris."}}],
                "usage": {"prompt_tokens": 21, "completion_tokens": 2, "total_tokens": 23}
            })))
            .mount(&server)
            .await;

        let completion = provider(ProviderKind::OpenAi, &server)
            .complete_with_usage(&prompt(), "gpt-4o", 0.2)
            .await;
        assert_eq!(completion.text, "Paris.");
        assert_eq!(completion.usage.source, UsageSource::Measured);
        assert_eq!(completion.usage.prompt_tokens, 21);
        assert_eq!(completion.usage.total_tokens, 23);
        assert_eq!(completion.usage.model_used, "gpt-4o");
    }

    #[tokio::test]
    async fn buffered_failure_returns_estimated_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let completion = provider(ProviderKind::DeepSeek, &server)
            .complete_with_usage(&prompt(), "deepseek-chat", 0.2)
            .await;
        assert!(completion.usage.is_estimated());
        assert!(completion.text.contains("deepseek"));
        assert!(completion.usage.prompt_tokens > 0);
    }

    #[tokio::test]
    async fn response_without_usage_is_not_measured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Paris."}}]
            })))
            .mount(&server)
            .await;

        let completion = provider(ProviderKind::OpenAi, &server)
            .complete_with_usage(&prompt(), "gpt-4o", 0.2)
            .await;
        assert!(completion.usage.is_estimated());
    }
}
