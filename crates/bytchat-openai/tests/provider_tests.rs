// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter behavior through the `ProviderAdapter` trait object.

use std::sync::Arc;

use bytchat_config::model::ProviderConfig;
use bytchat_core::{PromptPackage, ProviderAdapter, ProviderKind, StreamFragment};
use bytchat_openai::OpenAiCompatProvider;
use futures::StreamExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer) -> Arc<dyn ProviderAdapter> {
    let config = ProviderConfig {
        api_key: Some("sk-test".into()),
        base_url: Some(server.uri()),
        timeout_secs: 10,
        ..ProviderConfig::default()
    };
    Arc::new(OpenAiCompatProvider::new(ProviderKind::OpenAi, &config).unwrap())
}

fn sse_body(parts: &[&str]) -> String {
    let mut body: String = parts
        .iter()
        .map(|p| format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{p}\"}}}}]}}\n\n"))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn streaming_recovers_from_one_transient_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&["Hello", " world"])),
        )
        .mount(&server)
        .await;

    let provider = adapter(&server);
    assert_eq!(provider.kind(), ProviderKind::OpenAi);
    let text: String = provider
        .stream_completion(&PromptPackage::new("sys", "hi"), "gpt-4o-mini", 0.7)
        .await
        .map(StreamFragment::into_text)
        .collect()
        .await;
    assert_eq!(text, "Hello world");
}

#[tokio::test]
async fn dropping_the_stream_early_is_clean() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&["one", "two", "three"])),
        )
        .mount(&server)
        .await;

    let provider = adapter(&server);
    let mut stream = provider
        .stream_completion(&PromptPackage::new("sys", "count"), "gpt-4o-mini", 0.7)
        .await;
    assert_eq!(stream.next().await, Some(StreamFragment::Text("one".into())));
    drop(stream);

    // The adapter stays usable after an abandoned stream.
    let again: Vec<_> = provider
        .stream_completion(&PromptPackage::new("sys", "count"), "gpt-4o-mini", 0.7)
        .await
        .collect()
        .await;
    assert_eq!(again.len(), 3);
}

#[tokio::test]
async fn truncated_stream_ends_with_error_fragment() {
    let server = MockServer::start().await;
    let mut body = sse_body(&["Hel"]);
    body.truncate(body.len() - "data: [DONE]\n\n".len());
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let fragments: Vec<_> = adapter(&server)
        .stream_completion(&PromptPackage::new("sys", "hi"), "gpt-4o-mini", 0.7)
        .await
        .collect()
        .await;
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0], StreamFragment::Text("Hel".into()));
    assert!(fragments[1].is_error());
}
