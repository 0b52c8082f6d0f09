// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Roster selection.
//!
//! Order of preference: first active `complex` entry when the query matched a
//! keyword, then the first active `general`/`simple` entry, then the sole
//! active entry of the roster. Anything else is [`NoModelAvailable`].

use bytchat_core::{RosterEntry, TaskType};
use thiserror::Error;
use tracing::{debug, info};

use crate::classifier::{classify, Complexity, KEYWORD_SET_VERSION};

/// Why an entry was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteReason {
    ComplexKeyword,
    GeneralRoute,
    SoleActiveEntry,
}

impl std::fmt::Display for RouteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteReason::ComplexKeyword => write!(f, "complex keyword"),
            RouteReason::GeneralRoute => write!(f, "general route"),
            RouteReason::SoleActiveEntry => write!(f, "sole active entry"),
        }
    }
}

/// The chosen roster entry plus the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub entry: RosterEntry,
    pub reason: RouteReason,
    /// Keyword that made the query complex, if any.
    pub keyword: Option<&'static str>,
}

/// The roster has nothing that can serve the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no active model available (roster size {roster_len}, {active} active)")]
pub struct NoModelAvailable {
    pub roster_len: usize,
    pub active: usize,
}

/// Stateless router; cheap to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelRouter;

impl ModelRouter {
    pub fn new() -> Self {
        Self
    }

    /// Pick a roster entry for `query`.
    pub fn select(
        &self,
        query: &str,
        roster: &[RosterEntry],
    ) -> Result<RoutingDecision, NoModelAvailable> {
        let complexity = classify(query);
        let decision = route(complexity, roster);

        match &decision {
            Ok(d) => info!(
                provider = %d.entry.provider,
                model = %d.entry.model_id,
                task_type = %d.entry.task_type,
                reason = %d.reason,
                keyword = d.keyword.unwrap_or("-"),
                keyword_set = KEYWORD_SET_VERSION,
                "model routed"
            ),
            Err(e) => debug!(
                roster_len = e.roster_len,
                active = e.active,
                "no model available"
            ),
        }
        decision
    }
}

fn route(
    complexity: Complexity,
    roster: &[RosterEntry],
) -> Result<RoutingDecision, NoModelAvailable> {
    let mut active = roster.iter().filter(|e| e.active);

    if let Complexity::Complex(keyword) = complexity
        && let Some(entry) = active.clone().find(|e| e.task_type == TaskType::Complex)
    {
        return Ok(RoutingDecision {
            entry: entry.clone(),
            reason: RouteReason::ComplexKeyword,
            keyword: Some(keyword),
        });
    }

    if let Some(entry) = active.clone().find(|e| e.task_type.is_general_route()) {
        return Ok(RoutingDecision {
            entry: entry.clone(),
            reason: RouteReason::GeneralRoute,
            keyword: complexity.keyword(),
        });
    }

    match (active.next(), active.next()) {
        (Some(only), None) => Ok(RoutingDecision {
            entry: only.clone(),
            reason: RouteReason::SoleActiveEntry,
            keyword: complexity.keyword(),
        }),
        _ => Err(NoModelAvailable {
            roster_len: roster.len(),
            active: roster.iter().filter(|e| e.active).count(),
        }),
    }
}
