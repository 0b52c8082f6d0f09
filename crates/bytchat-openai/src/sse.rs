// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for streamed chat completions.
//!
//! Each `data:` line carries a JSON chunk whose first choice holds a content
//! delta. The literal `[DONE]` ends the stream; an `{"error": ...}` payload is
//! an in-band failure, and so is a body that closes before `[DONE]`.

use std::pin::Pin;

use bytchat_core::BytchatError;
use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::{self, Stream, StreamExt};

use crate::types::{ApiErrorResponse, ChatChunk};

/// Answer text deltas, or the error that ended the stream.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, BytchatError>> + Send>>;

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug)]
enum SseItem {
    Text(String),
    Done,
}

/// Parse a streaming response body into text deltas.
///
/// Chunks without content (role announcements, finish markers) are skipped.
/// Nothing after `[DONE]` is read. A body that ends without it yields a
/// final error so a cut connection never passes for a complete answer.
pub fn parse_sse_stream(response: reqwest::Response) -> TextStream {
    let events = response.bytes_stream().eventsource();

    let items = events.filter_map(|result| async move {
        match result {
            Ok(event) => parse_data(&event.data).transpose(),
            Err(e) => Some(Err(BytchatError::Provider {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });
    let truncated = stream::once(future::ready(Err(BytchatError::provider(
        "stream ended before [DONE]",
    ))));

    let texts = items
        .chain(truncated)
        .take_while(|item| future::ready(!matches!(item, Ok(SseItem::Done))))
        .filter_map(|item| {
            future::ready(match item {
                Ok(SseItem::Text(text)) => Some(Ok(text)),
                Ok(SseItem::Done) => None,
                Err(e) => Some(Err(e)),
            })
        });

    Box::pin(texts)
}

fn parse_data(data: &str) -> Result<Option<SseItem>, BytchatError> {
    let data = data.trim();
    if data == DONE_SENTINEL {
        return Ok(Some(SseItem::Done));
    }
    if let Ok(err) = serde_json::from_str::<ApiErrorResponse>(data) {
        return Err(BytchatError::provider(format!("in-band stream error ({})", err.error)));
    }
    let chunk: ChatChunk = serde_json::from_str(data).map_err(|e| BytchatError::Provider {
        message: format!("failed to parse stream chunk: {e}"),
        source: Some(Box::new(e)),
    })?;
    Ok(chunk.delta_text().map(SseItem::Text))
}
