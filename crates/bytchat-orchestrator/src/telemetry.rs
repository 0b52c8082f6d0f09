// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric hooks; no-ops unless built with the `prometheus` feature.

#[cfg(feature = "prometheus")]
use bytchat_prometheus::recording;

use crate::stage::DeliveryPath;

#[allow(unused_variables)]
pub(crate) fn query_handled(path: DeliveryPath) {
    #[cfg(feature = "prometheus")]
    recording::record_query(path.as_str());
}

pub(crate) fn quota_denied() {
    #[cfg(feature = "prometheus")]
    recording::record_quota_denial();
}

#[allow(unused_variables)]
pub(crate) fn provider_fallback(provider: &str) {
    #[cfg(feature = "prometheus")]
    recording::record_provider_fallback(provider);
}

#[allow(unused_variables)]
pub(crate) fn usage_billed(provider: &str, credits: i64, latency_ms: u64) {
    #[cfg(feature = "prometheus")]
    {
        recording::record_credits_charged(provider, credits);
        recording::record_provider_latency(provider, latency_ms);
    }
}

pub(crate) fn ledger_failed() {
    #[cfg(feature = "prometheus")]
    recording::record_ledger_failure();
}
