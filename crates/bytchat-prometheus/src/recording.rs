// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a
//! no-op.

use metrics::{describe_counter, describe_histogram};

pub const QUERIES_TOTAL: &str = "bytchat_queries_total";
pub const QUOTA_DENIALS_TOTAL: &str = "bytchat_quota_denials_total";
pub const PROVIDER_FALLBACKS_TOTAL: &str = "bytchat_provider_fallbacks_total";
pub const CREDITS_CHARGED_TOTAL: &str = "bytchat_credits_charged_total";
pub const LEDGER_FAILURES_TOTAL: &str = "bytchat_ledger_write_failures_total";
pub const PROVIDER_LATENCY_SECONDS: &str = "bytchat_provider_latency_seconds";

/// Register all Bytchat metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(QUERIES_TOTAL, "Queries handled, by path (metered or streaming)");
    describe_counter!(QUOTA_DENIALS_TOTAL, "Metered queries refused by the admission check");
    describe_counter!(
        PROVIDER_FALLBACKS_TOTAL,
        "Metered calls that failed and fell back to streaming"
    );
    describe_counter!(CREDITS_CHARGED_TOTAL, "Credits debited from quota accounts");
    describe_counter!(
        LEDGER_FAILURES_TOTAL,
        "Answers delivered whose usage could not be recorded"
    );
    describe_histogram!(
        PROVIDER_LATENCY_SECONDS,
        "Buffered provider call latency in seconds"
    );
}

/// Record a handled query on the `metered` or `streaming` path.
pub fn record_query(path: &'static str) {
    metrics::counter!(QUERIES_TOTAL, "path" => path).increment(1);
}

pub fn record_quota_denial() {
    metrics::counter!(QUOTA_DENIALS_TOTAL).increment(1);
}

/// Record a metered call that fell back to streaming.
pub fn record_provider_fallback(provider: &str) {
    metrics::counter!(PROVIDER_FALLBACKS_TOTAL, "provider" => provider.to_string()).increment(1);
}

pub fn record_credits_charged(provider: &str, credits: i64) {
    metrics::counter!(CREDITS_CHARGED_TOTAL, "provider" => provider.to_string())
        .increment(credits.max(0) as u64);
}

pub fn record_ledger_failure() {
    metrics::counter!(LEDGER_FAILURES_TOTAL).increment(1);
}

/// Record buffered provider latency.
pub fn record_provider_latency(provider: &str, latency_ms: u64) {
    metrics::histogram!(PROVIDER_LATENCY_SECONDS, "provider" => provider.to_string())
        .record(latency_ms as f64 / 1000.0);
}

#[cfg(test)]
mod tests {
    use metrics_exporter_prometheus::PrometheusBuilder;

    use super::*;

    #[test]
    fn helpers_reach_a_local_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            record_query("metered");
            record_query("metered");
            record_query("streaming");
            record_quota_denial();
            record_provider_fallback("deepseek");
            record_credits_charged("openai", 12);
            record_ledger_failure();
            record_provider_latency("google", 250);
        });

        let rendered = handle.render();
        assert!(rendered.contains("bytchat_queries_total{path=\"metered\"} 2"), "{rendered}");
        assert!(rendered.contains("bytchat_queries_total{path=\"streaming\"} 1"));
        assert!(rendered.contains("bytchat_credits_charged_total{provider=\"openai\"} 12"));
        assert!(rendered.contains("bytchat_provider_fallbacks_total{provider=\"deepseek\"} 1"));
        assert!(rendered.contains("bytchat_provider_latency_seconds"));
    }

    #[test]
    fn negative_credits_are_clamped() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || record_credits_charged("google", -5));
        assert!(handle.render().contains("bytchat_credits_charged_total{provider=\"google\"} 0"));
    }
}
