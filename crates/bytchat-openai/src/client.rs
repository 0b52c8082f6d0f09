// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for chat-completions endpoints.
//!
//! Provides [`ChatClient`], which handles bearer authentication, streaming
//! SSE responses, and a single retry on transient errors.

use std::time::Duration;

use bytchat_core::BytchatError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::sse::{self, TextStream};
use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

/// Delay before the single retry of a transient failure.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP client for one OpenAI-compatible vendor.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl ChatClient {
    /// Creates a client posting to `{base_url}/chat/completions`.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, BytchatError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
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
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            max_retries: 1,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Shortens the retry delay (for testing with wiremock).
    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a streaming request and returns the text deltas.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<TextStream, BytchatError> {
        let mut req = request.clone();
        req.stream = true;
        let response = self.send(&req).await?;
        Ok(sse::parse_sse_stream(response))
    }

    /// Sends a non-streaming request and returns the full response.
    pub async fn complete_chat(&self, request: &ChatRequest) -> Result<ChatResponse, BytchatError> {
        let mut req = request.clone();
        req.stream = false;
        let response = self.send(&req).await?;
        let body = response.text().await.map_err(|e| BytchatError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| BytchatError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// POSTs `request`, retrying once on 429/500/503.
    ///
    /// Returns the successful response with its body unread.
    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, BytchatError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying chat request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .json(request)
                .send()
                .await
                .map_err(|e| BytchatError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, stream = request.stream, "chat response received");

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(BytchatError::provider(format!("API returned {status}: {body}")));
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("API error ({status}): {}", api_err.error),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(BytchatError::provider(message));
        }

        Err(last_error
            .unwrap_or_else(|| BytchatError::provider("chat request failed after retries")))
    }
}

/// True for statuses worth one retry.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::types::ChatMessage;

    fn test_client(base_url: &str) -> ChatClient {
        ChatClient::new("sk-test", &format!("{base_url}/v1/"), Duration::from_secs(5))
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    fn test_request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4o".into(),
            messages: vec![ChatMessage::system("Be brief."), ChatMessage::user("Hello")],
            temperature: 0.7,
            max_tokens: 128,
            stream: false,
        }
    }

    fn success_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-2024-08-06",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        })
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = ChatClient::new("k", "https://api.deepseek.com/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "https://api.deepseek.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn complete_chat_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Hi there")))
            .mount(&server)
            .await;

        let response = test_client(&server.uri())
            .complete_chat(&test_request())
            .await
            .unwrap();
        assert_eq!(response.text(), "Hi there");
        assert_eq!(response.usage.unwrap().prompt_tokens, 12);
    }

    #[tokio::test]
    async fn retries_once_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("After retry")))
            .mount(&server)
            .await;

        let response = test_client(&server.uri())
            .complete_chat(&test_request())
            .await
            .unwrap();
        assert_eq!(response.text(), "After retry");
    }

    #[tokio::test]
    async fn gives_up_after_second_503() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"message": "overloaded", "type": "server_error"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_chat(&test_request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("overloaded"), "got: {err}");
    }

    #[tokio::test]
    async fn does_not_retry_on_401() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_chat(&test_request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn stream_chat_sets_stream_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(
                        "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: [DONE]\n\n",
                    ),
            )
            .mount(&server)
            .await;

        let texts: Vec<_> = test_client(&server.uri())
            .stream_chat(&test_request())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].as_ref().unwrap(), "ok");
    }
}
