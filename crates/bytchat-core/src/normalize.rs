// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure normalization shared by every provider adapter.
//!
//! Adapters talk to their vendor with fallible clients and hand the raw
//! results to these helpers, which turn failures into user-safe text. Neither
//! helper ever returns an error.

use std::fmt::Display;
use std::time::Instant;

use futures::stream::{self, Stream, StreamExt};
use tracing::warn;

use crate::tokens::estimate_tokens;
use crate::types::{
    Completion, CompletionUsage, FragmentStream, PromptPackage, StreamFragment, UsageSource,
};

/// User-safe text returned when a provider cannot be reached.
pub fn apology(provider: &str) -> String {
    format!("Sorry, I had a problem connecting to the {provider} service. Please try again.")
}

/// Build the apology completion for a failed buffered call.
///
/// Token counts come from the word heuristic and are tagged
/// [`UsageSource::Estimated`] so callers never bill them.
pub fn fallback_completion(
    provider: &str,
    prompt: &PromptPackage,
    model: &str,
    started: Instant,
) -> Completion {
    let text = apology(provider);
    let prompt_tokens =
        estimate_tokens(&prompt.system_prompt).saturating_add(estimate_tokens(&prompt.user_question));
    let completion_tokens = estimate_tokens(&text);
    Completion {
        usage: CompletionUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            model_used: model.to_string(),
            latency_ms: started.elapsed().as_millis() as u64,
            source: UsageSource::Estimated,
        },
        text,
    }
}

/// Wrap a fallible text stream into a [`FragmentStream`].
///
/// `opened` is the result of starting the request. If it failed, or if the
/// stream yields an error part-way, exactly one [`StreamFragment::Error`] is
/// emitted and the stream ends without polling the source again.
pub fn guard_stream<S, E>(provider: &str, opened: Result<S, E>) -> FragmentStream
where
    S: Stream<Item = Result<String, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let provider = provider.to_string();
    let source = match opened {
        Ok(source) => source,
        Err(e) => {
            warn!(provider = %provider, error = %e, "provider stream failed to open");
            return Box::pin(stream::once(async move {
                StreamFragment::Error(apology(&provider))
            }));
        }
    };

    Box::pin(stream::unfold(
        Some(Box::pin(source)),
        move |state| {
            let provider = provider.clone();
            async move {
                let mut source = state?;
                match source.next().await {
                    Some(Ok(text)) => Some((StreamFragment::Text(text), Some(source))),
                    Some(Err(e)) => {
                        warn!(provider = %provider, error = %e, "provider stream failed mid-answer");
                        Some((StreamFragment::Error(apology(&provider)), None))
                    }
                    None => None,
                }
            }
        },
    ))
}
