// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-stage request outcomes.
//!
//! Pipeline stages return an [`Outcome`] instead of raising: a degraded stage
//! lets the request continue with reduced quality, a fatal one ends it with a
//! user-facing message.

use strum::Display;

/// Result of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Ok(T),
    Degraded(DegradeReason),
    Fatal(FailureKind),
}

impl<T> Outcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::Fatal(_))
    }

    /// Converts into the success value, dropping degrade/fatal detail.
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            _ => None,
        }
    }
}

/// Non-fatal failure; the request carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DegradeReason {
    /// Context search returned nothing usable; answer without augmentation.
    RetrievalDegraded,
    /// Buffered provider call failed; fall back to streaming.
    ProviderCallFailed,
    /// Usage record could not be persisted; needs reconciliation.
    LedgerWriteFailed,
}

/// Request-ending failure surfaced to the user as a single fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    BotNotFound,
    NoModelAvailable,
    QuotaExceeded,
    /// The quota ledger could not be read, so admission failed closed.
    BillingUnavailable,
}

impl FailureKind {
    /// Text shown to the end user in place of an answer.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::BotNotFound => "Sorry, this assistant is not available right now.",
            FailureKind::NoModelAvailable => {
                "Sorry, no AI model is currently available for this assistant. Please try again later."
            }
            FailureKind::QuotaExceeded => {
                "You have used all the credits included in your plan. Upgrade your plan to keep chatting."
            }
            FailureKind::BillingUnavailable => {
                "Sorry, I had a problem connecting to the billing service. Please try again."
            }
        }
    }
}
