// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for `streamGenerateContent?alt=sse`.
//!
//! Every event is a complete `GenerateContentResponse` carrying the next
//! slice of text. The event whose candidate has a `finishReason` is the last
//! one read; a body that closes before it is a failure.

use std::pin::Pin;

use bytchat_core::BytchatError;
use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::{self, Stream, StreamExt};

use crate::types::{ApiErrorResponse, GenerateContentResponse};

/// Answer text slices, or the error that ended the stream.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, BytchatError>> + Send>>;

#[derive(Debug)]
enum SseItem {
    Text(String),
    Finished,
}

/// Parse a streaming response body into text slices.
pub fn parse_sse_stream(response: reqwest::Response) -> TextStream {
    let events = response.bytes_stream().eventsource();

    let items = events.flat_map(|result| {
        let items: Vec<Result<SseItem, BytchatError>> = match result {
            Ok(event) => match parse_event(&event.data) {
                Ok(items) => items.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            },
            Err(e) => vec![Err(BytchatError::Provider {
                message: format!("SSE stream error: {e}"),
                source: None,
            })],
        };
        stream::iter(items)
    });
    let truncated = stream::once(future::ready(Err(BytchatError::provider(
        "stream ended before finishReason",
    ))));

    let texts = items
        .chain(truncated)
        .take_while(|item| future::ready(!matches!(item, Ok(SseItem::Finished))))
        .filter_map(|item| {
            future::ready(match item {
                Ok(SseItem::Text(text)) => Some(Ok(text)),
                Ok(SseItem::Finished) => None,
                Err(e) => Some(Err(e)),
            })
        });

    Box::pin(texts)
}

/// Text of one event, followed by `Finished` when the event closes the answer.
fn parse_event(data: &str) -> Result<Vec<SseItem>, BytchatError> {
    if let Ok(err) = serde_json::from_str::<ApiErrorResponse>(data) {
        return Err(BytchatError::provider(format!("in-band stream error ({})", err.error)));
    }
    let response: GenerateContentResponse =
        serde_json::from_str(data).map_err(|e| BytchatError::Provider {
            message: format!("failed to parse stream event: {e}"),
            source: Some(Box::new(e)),
        })?;
    if let Some(reason) = response.block_reason() {
        return Err(BytchatError::provider(format!("prompt blocked: {reason}")));
    }

    let mut items = Vec::with_capacity(2);
    let text = response.text();
    if !text.is_empty() {
        items.push(SseItem::Text(text));
    }
    if response.finish_reason().is_some() {
        items.push(SseItem::Finished);
    }
    Ok(items)
}
