// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credit quota, usage metering, and pricing for the Bytchat gateway.
//!
//! - **Pricing**: per-model USD rates resolved from the admin table, the
//!   built-in table, or a default, converted to credits (1000 = $1)
//! - **Accounts**: plan tiers, admission rules, and allotment-then-overage debits
//! - **Ledger**: atomic debits with an append-only usage record per billed request

pub mod account;
pub mod ledger;
pub mod pricing;

pub use account::{Admission, PlanTier, QuotaAccount};
pub use ledger::{QuotaLedger, UsageRecord, UsageSummary};
pub use pricing::{ModelCostEstimate, PriceRate, PriceRow, PriceSource, PriceTable};
