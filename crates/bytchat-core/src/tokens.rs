// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Word-count token heuristic shared by admission estimates and provider
//! fallbacks.

/// Tokens charged per whitespace-separated word.
pub const TOKENS_PER_WORD: f64 = 0.75;

/// Estimate the token count of `text`.
///
/// Rounds up so any non-empty text costs at least one token.
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    (words as f64 * TOKENS_PER_WORD).ceil() as u32
}
