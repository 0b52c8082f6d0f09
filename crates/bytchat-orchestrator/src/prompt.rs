// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly.

use bytchat_core::{BotConfig, PromptPackage};

/// Separator between retrieved chunks inside the context block.
const CHUNK_SEPARATOR: &str = "\n---\n";

/// Build the provider prompt for one query.
///
/// The bot's own system prompt wins over `default_system_prompt`. Retrieved
/// chunks, when present, are prepended to the question; with no chunks the
/// question is passed through untouched.
pub fn build_prompt(
    bot: &BotConfig,
    default_system_prompt: &str,
    query: &str,
    context: &[String],
) -> PromptPackage {
    let system_prompt = bot
        .system_prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(default_system_prompt);

    if context.is_empty() {
        return PromptPackage::new(system_prompt, query);
    }

    let user_question = format!(
        "Answer using the following context when it is relevant.\n\n\
         Context:\n{}\n\nQuestion: {query}",
        context.join(CHUNK_SEPARATOR)
    );
    PromptPackage::new(system_prompt, user_question)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(prompt: Option<&str>) -> BotConfig {
        BotConfig {
            bot_id: 1,
            name: "support".into(),
            system_prompt: prompt.map(str::to_string),
            roster: Vec::new(),
        }
    }

    #[test]
    fn plain_question_without_context() {
        let prompt = build_prompt(&bot(None), "default", "hello", &[]);
        assert_eq!(prompt.system_prompt, "default");
        assert_eq!(prompt.user_question, "hello");
    }

    #[test]
    fn bot_prompt_overrides_default() {
        let prompt = build_prompt(&bot(Some("You sell shoes.")), "default", "hi", &[]);
        assert_eq!(prompt.system_prompt, "You sell shoes.");

        let blank = build_prompt(&bot(Some("  ")), "default", "hi", &[]);
        assert_eq!(blank.system_prompt, "default");
    }

    #[test]
    fn context_is_prepended_in_order() {
        let chunks = vec!["first chunk".to_string(), "second chunk".to_string()];
        let prompt = build_prompt(&bot(None), "default", "what is it?", &chunks);
        let first = prompt.user_question.find("first chunk").unwrap();
        let second = prompt.user_question.find("second chunk").unwrap();
        let question = prompt.user_question.find("Question: what is it?").unwrap();
        assert!(first < second && second < question);
    }
}
