// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-based query complexity detection.
//!
//! A query is complex when its lower-cased text contains any entry of
//! [`COMPLEXITY_KEYWORDS`] as a substring. No scoring, no network, no model.

/// Bumped whenever [`COMPLEXITY_KEYWORDS`] changes so routing changes can be
/// correlated with logs.
pub const KEYWORD_SET_VERSION: u32 = 1;

/// English and Spanish stems that mark a request as complex.
pub const COMPLEXITY_KEYWORDS: &[&str] = &[
    "analyze", "summarize", "translate", "explain", "code", "table", "list",
    "optimize", "compare", "create",
    "analiza", "resume", "traduce", "explica", "código", "tabla", "lista",
    "optimiza", "compara", "crea",
];

/// Outcome of scanning a query for complexity keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    /// The query matched this keyword (first in list order).
    Complex(&'static str),
    Standard,
}

impl Complexity {
    pub fn is_complex(&self) -> bool {
        matches!(self, Complexity::Complex(_))
    }

    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Complexity::Complex(k) => Some(k),
            Complexity::Standard => None,
        }
    }
}

/// Classify a query against the keyword list.
pub fn classify(query: &str) -> Complexity {
    let lower = query.to_lowercase();
    COMPLEXITY_KEYWORDS
        .iter()
        .find(|k| lower.contains(*k))
        .map_or(Complexity::Standard, |k| Complexity::Complex(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_are_standard() {
        assert_eq!(classify("hi"), Complexity::Standard);
        assert_eq!(classify("hola, ¿qué tal?"), Complexity::Standard);
        assert_eq!(classify(""), Complexity::Standard);
    }

    #[test]
    fn english_keywords_match_case_insensitively() {
        assert_eq!(classify("Summarize this text"), Complexity::Complex("summarize"));
        assert_eq!(classify("please EXPLAIN monads"), Complexity::Complex("explain"));
    }

    #[test]
    fn spanish_keywords_match() {
        assert_eq!(classify("Traduce esto al inglés"), Complexity::Complex("traduce"));
        assert_eq!(classify("Escribe CÓDIGO en Rust"), Complexity::Complex("código"));
    }

    #[test]
    fn substring_semantics_match_inside_words() {
        // "listing" contains "list"
        assert!(classify("a listing of files").is_complex());
    }

    #[test]
    fn first_keyword_in_list_order_is_reported() {
        assert_eq!(
            classify("compare and analyze").keyword(),
            Some("analyze")
        );
    }
}
