// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model routing for the Bytchat gateway.
//!
//! - [`classifier`]: versioned keyword list and query complexity check
//! - [`ModelRouter`]: picks a `(provider, model)` from a bot's roster

pub mod classifier;
pub mod router;

pub use classifier::{classify, Complexity, COMPLEXITY_KEYWORDS, KEYWORD_SET_VERSION};
pub use router::{ModelRouter, NoModelAvailable, RouteReason, RoutingDecision};
