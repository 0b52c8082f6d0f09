// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota accounts and the pure admission/debit rules.

use bytchat_config::model::{PlanPreset, PlanPresets};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Subscription tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Enterprise,
}

impl PlanTier {
    /// Free accounts have a hard cap; paid tiers run into overage.
    pub fn is_paid(&self) -> bool {
        !matches!(self, PlanTier::Free)
    }

    pub fn preset<'a>(&self, presets: &'a PlanPresets) -> &'a PlanPreset {
        match self {
            PlanTier::Free => &presets.free,
            PlanTier::Pro => &presets.pro,
            PlanTier::Enterprise => &presets.enterprise,
        }
    }
}

/// One owner's credit balance for the current period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaAccount {
    pub owner_id: i64,
    pub plan: PlanTier,
    pub monthly_price_cents: i64,
    pub credits_included: i64,
    pub credits_remaining: i64,
    pub overage_used: i64,
    /// USD accrued per overage credit.
    pub overage_rate: f64,
    /// Declared overage ceiling; reported, never enforced.
    pub overage_cap: i64,
    pub overage_cost_usd: f64,
    pub period_start: String,
    pub period_end: String,
}

/// Result of a pre-flight quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub allowed: bool,
    pub will_overage: bool,
    /// Credits the request would take beyond the remaining allotment.
    pub overage_credits: i64,
}

/// How a charge splits between the allotment and overage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debit {
    pub from_included: i64,
    pub overage: i64,
}

impl QuotaAccount {
    /// Decide whether a request estimated at `estimated_credits` may proceed.
    pub fn admission(&self, estimated_credits: i64) -> Admission {
        let shortfall = (estimated_credits - self.credits_remaining).max(0);
        Admission {
            allowed: self.plan.is_paid() || shortfall == 0,
            will_overage: shortfall > 0,
            overage_credits: shortfall,
        }
    }

    /// Split `charge` so the allotment is drained before any overage.
    pub fn split_charge(&self, charge: i64) -> Debit {
        let from_included = charge.min(self.credits_remaining.max(0));
        Debit {
            from_included,
            overage: charge - from_included,
        }
    }

    /// Apply a debit in place.
    pub fn apply(&mut self, debit: Debit) {
        self.credits_remaining -= debit.from_included;
        self.overage_used += debit.overage;
        self.overage_cost_usd += debit.overage as f64 * self.overage_rate;
    }

    pub fn over_cap(&self) -> bool {
        self.overage_used > self.overage_cap
    }
}
