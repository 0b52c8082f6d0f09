// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model pricing and credit conversion.
//!
//! Prices are USD per 1000 tokens. Credits are the billing unit:
//! 1000 credits = $1. Lookup precedence is the admin-managed `model_pricing`
//! table, then the static table below, then [`DEFAULT_RATE`].

use bytchat_core::{BytchatError, ProviderKind};
use bytchat_storage::map_tr_err;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::info;

/// Credits per US dollar.
pub const CREDITS_PER_USD: f64 = 1000.0;

/// Input tokens assumed for a typical query in cost estimates.
pub const TYPICAL_PROMPT_TOKENS: u32 = 150;
/// Output tokens assumed for a typical query in cost estimates.
pub const TYPICAL_COMPLETION_TOKENS: u32 = 100;

/// USD per 1000 input and output tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRate {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl PriceRate {
    pub const fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }

    /// Cost in USD for the given token counts.
    pub fn cost_usd(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (prompt_tokens as f64 / 1000.0) * self.input_per_1k
            + (completion_tokens as f64 / 1000.0) * self.output_per_1k
    }

    /// Credits charged for the given token counts; never less than 1.
    pub fn charge_credits(&self, prompt_tokens: u32, completion_tokens: u32) -> i64 {
        let credits = (self.cost_usd(prompt_tokens, completion_tokens) * CREDITS_PER_USD).round();
        (credits as i64).max(1)
    }
}

/// Rate for models absent from both tables.
pub const DEFAULT_RATE: PriceRate = PriceRate::new(0.001, 0.001);

/// Built-in prices keyed by lower-cased model id.
const STATIC_PRICES: &[(&str, PriceRate)] = &[
    ("gpt-4o", PriceRate::new(0.005, 0.015)),
    ("gpt-4o-mini", PriceRate::new(0.00015, 0.0006)),
    ("gpt-4-turbo", PriceRate::new(0.01, 0.03)),
    ("o1-preview", PriceRate::new(0.015, 0.06)),
    ("o1-mini", PriceRate::new(0.003, 0.012)),
    ("gemini-pro", PriceRate::new(0.0015, 0.0015)),
    ("gemini-flash", PriceRate::new(0.00015, 0.0006)),
    ("gemini-ultra", PriceRate::new(0.003, 0.003)),
    ("deepseek-v2", PriceRate::new(0.0002, 0.0002)),
    ("deepseek-reasoner", PriceRate::new(0.002, 0.002)),
];

/// Static table entry for a model, if any.
pub fn static_rate(model: &str) -> Option<PriceRate> {
    let key = model.to_lowercase();
    STATIC_PRICES
        .iter()
        .find(|(id, _)| *id == key)
        .map(|(_, rate)| *rate)
}

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Dynamic,
    Static,
    Default,
}

/// A row of the admin-managed `model_pricing` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub provider: String,
    pub model_id: String,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
    pub active: bool,
}

/// Cost estimate for a typical query on one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCostEstimate {
    pub provider: ProviderKind,
    pub model_id: String,
    pub rate: PriceRate,
    pub source: PriceSource,
    pub cost_per_query_usd: f64,
    pub credits_per_query: i64,
}

/// Resolve a price on an open connection. Used inside the debit transaction.
pub(crate) fn resolve_rate(
    conn: &rusqlite::Connection,
    provider: &str,
    model: &str,
) -> Result<(PriceRate, PriceSource), rusqlite::Error> {
    let dynamic = conn
        .query_row(
            "SELECT input_cost_per_1k, output_cost_per_1k FROM model_pricing
             WHERE provider = ?1 AND model_id = ?2 AND active = 1",
            params![provider.to_lowercase(), model.to_lowercase()],
            |row| Ok(PriceRate::new(row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    Ok(match (dynamic, static_rate(model)) {
        (Some(rate), _) => (rate, PriceSource::Dynamic),
        (None, Some(rate)) => (rate, PriceSource::Static),
        (None, None) => (DEFAULT_RATE, PriceSource::Default),
    })
}

/// Price lookups and admin maintenance of the `model_pricing` table.
#[derive(Clone)]
pub struct PriceTable {
    conn: tokio_rusqlite::Connection,
}

impl PriceTable {
    pub fn new(conn: tokio_rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Resolve the rate for a `(provider, model)` pair.
    pub async fn rate(
        &self,
        provider: ProviderKind,
        model: &str,
    ) -> Result<(PriceRate, PriceSource), BytchatError> {
        let provider = provider.to_string();
        let model = model.to_string();
        self.conn
            .call(move |conn| resolve_rate(conn, &provider, &model))
            .await
            .map_err(map_tr_err)
    }

    /// Credits a request with these token counts would be charged.
    pub async fn estimate_credits(
        &self,
        provider: ProviderKind,
        model: &str,
        prompt_tokens: u32,
        completion_tokens: u32,
    ) -> Result<i64, BytchatError> {
        let (rate, _) = self.rate(provider, model).await?;
        Ok(rate.charge_credits(prompt_tokens, completion_tokens))
    }

    /// Cost of a typical query (150 input / 100 output tokens).
    pub async fn model_cost_estimate(
        &self,
        provider: ProviderKind,
        model: &str,
    ) -> Result<ModelCostEstimate, BytchatError> {
        let (rate, source) = self.rate(provider, model).await?;
        let cost = rate.cost_usd(TYPICAL_PROMPT_TOKENS, TYPICAL_COMPLETION_TOKENS);
        Ok(ModelCostEstimate {
            provider,
            model_id: model.to_string(),
            rate,
            source,
            cost_per_query_usd: (cost * 10_000.0).round() / 10_000.0,
            credits_per_query: rate.charge_credits(TYPICAL_PROMPT_TOKENS, TYPICAL_COMPLETION_TOKENS),
        })
    }

    /// Insert or replace an active price row.
    pub async fn upsert_price(
        &self,
        provider: ProviderKind,
        model: &str,
        rate: PriceRate,
    ) -> Result<(), BytchatError> {
        if !(rate.input_per_1k >= 0.0 && rate.output_per_1k >= 0.0) {
            return Err(BytchatError::Internal(format!(
                "price for {provider}/{model} must be non-negative"
            )));
        }
        let provider_key = provider.to_string();
        let model_key = model.to_lowercase();
        let updated_at = now_timestamp();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO model_pricing
                        (provider, model_id, input_cost_per_1k, output_cost_per_1k, active, updated_at)
                     VALUES (?1, ?2, ?3, ?4, 1, ?5)
                     ON CONFLICT(provider, model_id) DO UPDATE SET
                        input_cost_per_1k = excluded.input_cost_per_1k,
                        output_cost_per_1k = excluded.output_cost_per_1k,
                        active = 1,
                        updated_at = excluded.updated_at",
                    params![
                        provider_key,
                        model_key,
                        rate.input_per_1k,
                        rate.output_per_1k,
                        updated_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        info!(
            provider = %provider,
            model = %model,
            input_per_1k = rate.input_per_1k,
            output_per_1k = rate.output_per_1k,
            "price updated"
        );
        Ok(())
    }

    /// Mark a price row inactive so lookups fall through to the static table.
    ///
    /// Returns false if no such row exists.
    pub async fn deactivate_price(
        &self,
        provider: ProviderKind,
        model: &str,
    ) -> Result<bool, BytchatError> {
        let provider_key = provider.to_string();
        let model_key = model.to_lowercase();
        let updated_at = now_timestamp();
        let changed = self
            .conn
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "UPDATE model_pricing SET active = 0, updated_at = ?3
                     WHERE provider = ?1 AND model_id = ?2",
                    params![provider_key, model_key, updated_at],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(changed > 0)
    }

    /// All rows of the admin table, active or not.
    pub async fn list_prices(&self) -> Result<Vec<PriceRow>, BytchatError> {
        self.conn
            .call(|conn| -> Result<Vec<PriceRow>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT provider, model_id, input_cost_per_1k, output_cost_per_1k, active
                     FROM model_pricing ORDER BY provider, model_id",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(PriceRow {
                        provider: row.get(0)?,
                        model_id: row.get(1)?,
                        input_cost_per_1k: row.get(2)?,
                        output_cost_per_1k: row.get(3)?,
                        active: row.get(4)?,
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }
}

pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use bytchat_storage::Database;

    use super::*;

    #[test]
    fn minimum_charge_is_one_credit() {
        let cheap = PriceRate::new(0.00015, 0.0006);
        assert_eq!(cheap.charge_credits(10, 10), 1);
        assert_eq!(cheap.charge_credits(0, 0), 1);
    }

    #[test]
    fn charge_rounds_to_nearest_credit() {
        // 1000 in * 0.005 + 1000 out * 0.015 = $0.02 = 20 credits
        assert_eq!(static_rate("GPT-4o").unwrap().charge_credits(1000, 1000), 20);
        // 150 * 0.001/1000 + 100 * 0.001/1000 = $0.00025 -> 0.25 credits -> 1 minimum
        assert_eq!(DEFAULT_RATE.charge_credits(150, 100), 1);
        // 2500 tokens each way at default: $0.005 = 5 credits
        assert_eq!(DEFAULT_RATE.charge_credits(2500, 2500), 5);
        // 0.4 credits would round down to zero
        assert_eq!(PriceRate::new(0.0004, 0.0).charge_credits(1000, 0), 1);
        // 2.6 credits rounds up
        assert_eq!(PriceRate::new(0.0026, 0.0).charge_credits(1000, 0), 3);
    }

    #[test]
    fn unknown_models_have_no_static_rate() {
        assert!(static_rate("gemini-1.5-pro").is_none());
        assert_eq!(static_rate("deepseek-reasoner"), Some(PriceRate::new(0.002, 0.002)));
    }

    #[tokio::test]
    async fn dynamic_row_overrides_static_until_deactivated() {
        let db = Database::open_in_memory().await.unwrap();
        let table = PriceTable::new(db.connection().clone());

        let (rate, source) = table.rate(ProviderKind::OpenAi, "gpt-4o").await.unwrap();
        assert_eq!(source, PriceSource::Static);
        assert_eq!(rate, PriceRate::new(0.005, 0.015));

        table
            .upsert_price(ProviderKind::OpenAi, "GPT-4o", PriceRate::new(0.0025, 0.01))
            .await
            .unwrap();
        let (rate, source) = table.rate(ProviderKind::OpenAi, "gpt-4o").await.unwrap();
        assert_eq!(source, PriceSource::Dynamic);
        assert_eq!(rate, PriceRate::new(0.0025, 0.01));

        // provider is part of the key
        let (_, source) = table.rate(ProviderKind::DeepSeek, "gpt-4o").await.unwrap();
        assert_eq!(source, PriceSource::Static);

        assert!(table.deactivate_price(ProviderKind::OpenAi, "gpt-4o").await.unwrap());
        let (_, source) = table.rate(ProviderKind::OpenAi, "gpt-4o").await.unwrap();
        assert_eq!(source, PriceSource::Static);
        assert!(!table.deactivate_price(ProviderKind::Google, "nope").await.unwrap());

        let rows = table.list_prices().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].active);
    }

    #[tokio::test]
    async fn unknown_model_uses_default_row() {
        let db = Database::open_in_memory().await.unwrap();
        let table = PriceTable::new(db.connection().clone());
        let estimate = table
            .model_cost_estimate(ProviderKind::Google, "gemini-1.5-flash")
            .await
            .unwrap();
        assert_eq!(estimate.source, PriceSource::Default);
        assert_eq!(estimate.rate, DEFAULT_RATE);
        assert_eq!(estimate.credits_per_query, 1);
        assert!((estimate.cost_per_query_usd - 0.00025).abs() < 1e-4);
    }

    #[tokio::test]
    async fn negative_prices_are_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        let table = PriceTable::new(db.connection().clone());
        assert!(table
            .upsert_price(ProviderKind::OpenAi, "gpt-4o", PriceRate::new(-1.0, 0.0))
            .await
            .is_err());
    }
}
