// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini adapters for the Bytchat gateway.
//!
//! [`GeminiProvider`] answers questions through `generateContent` and its SSE
//! streaming variant; [`GeminiEmbedder`] embeds retrieval queries through
//! `embedContent`.

pub mod client;
pub mod embedding;
pub mod sse;
pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytchat_config::model::ProviderConfig;
use bytchat_core::normalize::{fallback_completion, guard_stream};
use bytchat_core::{
    AdapterType, BytchatError, Completion, CompletionUsage, FragmentStream, HealthStatus,
    PluginAdapter, PromptPackage, ProviderAdapter, ProviderKind, UsageSource,
};
use tracing::{debug, info, warn};

pub use crate::embedding::GeminiEmbedder;

use crate::client::{GeminiClient, API_BASE_URL};
use crate::types::{Content, GenerateContentRequest, GenerationConfig};

const NAME: &str = "google";

/// Gemini provider implementing [`ProviderAdapter`].
pub struct GeminiProvider {
    client: GeminiClient,
    max_tokens: u32,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, BytchatError> {
        let api_key = require_key(config)?;
        let base_url = config.base_url.as_deref().unwrap_or(API_BASE_URL);
        let client = GeminiClient::new(api_key, base_url, Duration::from_secs(config.timeout_secs))?;
        info!(base_url, "Gemini provider initialized");
        Ok(Self {
            client,
            max_tokens: config.max_tokens,
        })
    }

    fn request(&self, prompt: &PromptPackage, temperature: f32) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Some(Content::text(None, &prompt.system_prompt)),
            contents: vec![Content::text(Some("user"), &prompt.user_question)],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }

    async fn try_complete(
        &self,
        prompt: &PromptPackage,
        model: &str,
        temperature: f32,
        started: Instant,
    ) -> Result<Completion, BytchatError> {
        let response = self.client.generate(model, &self.request(prompt, temperature)).await?;
        let usage = response
            .usage_metadata
            .ok_or_else(|| BytchatError::provider("response carried no usageMetadata"))?;
        Ok(Completion {
            text: response.text(),
            usage: CompletionUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage
                    .total_token_count
                    .unwrap_or(usage.prompt_token_count.saturating_add(usage.candidates_token_count)),
                model_used: model.to_string(),
                latency_ms: started.elapsed().as_millis() as u64,
                source: UsageSource::Measured,
            },
        })
    }
}

/// Non-blank API key of an enabled section.
pub(crate) fn require_key(config: &ProviderConfig) -> Result<&str, BytchatError> {
    config
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| BytchatError::Config("missing google.api_key".into()))
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        NAME
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
        debug!("Gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn stream_completion(
        &self,
        prompt: &PromptPackage,
        model: &str,
        temperature: f32,
    ) -> FragmentStream {
        let request = self.request(prompt, temperature);
        guard_stream(NAME, self.client.stream_generate(model, &request).await)
    }

    async fn complete_with_usage(
        &self,
        prompt: &PromptPackage,
        model: &str,
        temperature: f32,
    ) -> Completion {
        let started = Instant::now();
        match self.try_complete(prompt, model, temperature, started).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(provider = NAME, model, error = %e, "buffered completion failed");
                fallback_completion(NAME, prompt, model, started)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytchat_core::StreamFragment;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(&ProviderConfig {
            api_key: Some("g-test".into()),
            base_url: Some(server.uri()),
            max_tokens: 256,
            timeout_secs: 5,
            ..ProviderConfig::default()
        })
        .unwrap()
    }

    fn prompt() -> PromptPackage {
        PromptPackage::new("Answer in Spanish.", "What colour is the sky?")
    }

    #[test]
    fn blank_key_is_rejected() {
        let config = ProviderConfig {
            api_key: Some(" ".into()),
            ..ProviderConfig::default()
        };
        assert!(GeminiProvider::new(&config).is_err());
    }

    #[tokio::test]
    async fn buffered_answer_reads_usage_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "Answer in Spanish."}]},
                "contents": [{"role": "user", "parts": [{"text": "What colour is the sky?"}]}],
                "generationConfig": {"maxOutputTokens": 256}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Azul."}]}, "finishReason": "STOP"}],
                "usageMetadata": {"promptTokenCount": 11, "candidatesTokenCount": 2, "totalTokenCount": 13}
            })))
            .mount(&server)
            .await;

        let completion = provider(&server)
            .complete_with_usage(&prompt(), "gemini-1.5-flash", 0.3)
            .await;
        assert_eq!(completion.text, "Azul.");
        assert_eq!(completion.usage.source, UsageSource::Measured);
        assert_eq!(completion.usage.prompt_tokens, 11);
        assert_eq!(completion.usage.completion_tokens, 2);
        assert_eq!(completion.usage.total_tokens, 13);
    }

    #[tokio::test]
    async fn blocked_prompt_falls_back_to_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let completion = provider(&server)
            .complete_with_usage(&prompt(), "gemini-1.5-flash", 0.3)
            .await;
        assert!(completion.usage.is_estimated());
        assert!(completion.text.contains("google"));
    }

    #[tokio::test]
    async fn stream_emits_text_then_ends() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-pro:streamGenerateContent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(concat!(
                        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Az\"}]}}]}\n\n",
                        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ul\"}]},\"finishReason\":\"STOP\"}]}\n\n"
                    )),
            )
            .mount(&server)
            .await;

        let fragments: Vec<_> = provider(&server)
            .stream_completion(&prompt(), "gemini-1.5-pro", 0.3)
            .await
            .collect()
            .await;
        assert_eq!(
            fragments,
            vec![StreamFragment::Text("Az".into()), StreamFragment::Text("ul".into())]
        );
    }

    #[tokio::test]
    async fn stream_error_midway_ends_with_one_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(concat!(
                        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Az\"}]}}]}\n\n",
                        "data: {\"error\":{\"code\":500,\"message\":\"boom\",\"status\":\"INTERNAL\"}}\n\n",
                        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"never\"}]}}]}\n\n"
                    )),
            )
            .mount(&server)
            .await;

        let fragments: Vec<_> = provider(&server)
            .stream_completion(&prompt(), "gemini-1.5-pro", 0.3)
            .await
            .collect()
            .await;
        assert_eq!(fragments.len(), 2);
        assert!(fragments[1].is_error());
    }
}
