// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini `v1beta` API.

use std::time::Duration;

use bytchat_core::BytchatError;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::sse::{self, TextStream};
use crate::types::{
    ApiErrorResponse, Content, EmbedContentRequest, EmbedContentResponse, GenerateContentRequest,
    GenerateContentResponse,
};

/// Public Gemini endpoint.
pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Embedding task hint for search queries.
const QUERY_TASK_TYPE: &str = "RETRIEVAL_QUERY";

/// HTTP client authenticated with an `x-goog-api-key` header.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, BytchatError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| BytchatError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| BytchatError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
            retry_delay: RETRY_DELAY,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// `{base}/models/{model}:{method}`; accepts ids with or without the
    /// `models/` prefix.
    pub fn method_url(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:{method}", self.base_url)
    }

    /// Streams `streamGenerateContent` as SSE.
    pub async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<TextStream, BytchatError> {
        let url = format!("{}?alt=sse", self.method_url(model, "streamGenerateContent"));
        let response = self.send(&url, request).await?;
        Ok(sse::parse_sse_stream(response))
    }

    /// Calls `generateContent` and returns the whole response.
    pub async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, BytchatError> {
        let url = self.method_url(model, "generateContent");
        let response: GenerateContentResponse = read_json(self.send(&url, request).await?).await?;
        if let Some(reason) = response.block_reason() {
            return Err(BytchatError::provider(format!("prompt blocked: {reason}")));
        }
        Ok(response)
    }

    /// Embeds `text` as a retrieval query.
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, BytchatError> {
        let id = model.strip_prefix("models/").unwrap_or(model);
        let request = EmbedContentRequest {
            model: format!("models/{id}"),
            content: Content::text(None, text),
            task_type: QUERY_TASK_TYPE,
        };
        let url = self.method_url(id, "embedContent");
        let response: EmbedContentResponse = read_json(self.send(&url, &request).await?).await?;
        Ok(response.embedding.values)
    }

    /// POSTs `body`, retrying once on 429/500/503.
    async fn send<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, BytchatError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying Gemini request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| BytchatError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "Gemini response received");

            if status.is_success() {
                return Ok(response);
            }

            let text = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %text, "transient error, will retry");
                last_error = Some(BytchatError::provider(format!("API returned {status}: {text}")));
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
                Ok(api_err) => format!("Gemini API error ({status}): {}", api_err.error),
                Err(_) => format!("API returned {status}: {text}"),
            };
            return Err(BytchatError::provider(message));
        }

        Err(last_error
            .unwrap_or_else(|| BytchatError::provider("Gemini request failed after retries")))
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BytchatError> {
    let body = response.text().await.map_err(|e| BytchatError::Provider {
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&body).map_err(|e| BytchatError::Provider {
        message: format!("failed to parse API response: {e}"),
        source: Some(Box::new(e)),
    })
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
