// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota ledger: admission checks and atomic usage debits.
//!
//! Each debit (account read, price lookup, balance update, record insert) is a
//! single IMMEDIATE transaction on the shared tokio-rusqlite thread, so
//! concurrent requests for one owner never lose an update.

use std::collections::BTreeMap;
use std::str::FromStr;

use bytchat_config::model::{PlanPresets, QuotaConfig};
use bytchat_core::{BytchatError, CompletionUsage, ProviderKind};
use bytchat_storage::map_tr_err;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::{Admission, PlanTier, QuotaAccount};
use crate::pricing::{now_timestamp, resolve_rate, PriceSource, PriceTable};

/// Immutable record of one billed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// UUID v4.
    pub id: String,
    pub owner_id: i64,
    pub bot_id: i64,
    pub provider: ProviderKind,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Total credits charged for the request.
    pub charged_credits: i64,
    /// Portion of `charged_credits` billed as overage.
    pub overage_credits: i64,
    pub latency_ms: u64,
    pub created_at: String,
}

/// Aggregated usage for one owner since a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub requests: i64,
    pub credits_used: i64,
    pub overage_credits: i64,
    /// Credits per provider name.
    pub by_provider: BTreeMap<String, i64>,
}

/// Credit ledger over the `quota_accounts` and `usage_records` tables.
pub struct QuotaLedger {
    conn: tokio_rusqlite::Connection,
    prices: PriceTable,
    presets: PlanPresets,
    period_days: u32,
    expected_completion_tokens: u32,
}

impl QuotaLedger {
    pub fn new(conn: tokio_rusqlite::Connection, config: &QuotaConfig) -> Self {
        Self {
            prices: PriceTable::new(conn.clone()),
            conn,
            presets: config.plans.clone(),
            period_days: config.period_days,
            expected_completion_tokens: config.expected_completion_tokens,
        }
    }

    /// Admin access to the price table.
    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Credits a request would cost given its prompt size and the configured
    /// expected completion length.
    pub async fn estimate_request(
        &self,
        provider: ProviderKind,
        model: &str,
        prompt_tokens: u32,
    ) -> Result<i64, BytchatError> {
        self.prices
            .estimate_credits(provider, model, prompt_tokens, self.expected_completion_tokens)
            .await
    }

    /// Read an account without creating it.
    pub async fn account(&self, owner_id: i64) -> Result<Option<QuotaAccount>, BytchatError> {
        self.conn
            .call(move |conn| load_account(conn, owner_id))
            .await
            .map_err(map_tr_err)
    }

    /// Read an account, creating a free-tier one on first use.
    pub async fn ensure_account(&self, owner_id: i64) -> Result<QuotaAccount, BytchatError> {
        let seed = AccountSeed::new(PlanTier::Free, &self.presets, self.period_days);
        self.conn
            .call(move |conn| -> Result<QuotaAccount, rusqlite::Error> {
                seed.insert_if_missing(conn, owner_id)?;
                load_account(conn, owner_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Pre-flight quota decision for a metered request.
    pub async fn check_admission(
        &self,
        owner_id: i64,
        estimated_credits: i64,
    ) -> Result<Admission, BytchatError> {
        let account = self.ensure_account(owner_id).await?;
        let admission = account.admission(estimated_credits);
        debug!(
            owner_id,
            plan = %account.plan,
            credits_remaining = account.credits_remaining,
            estimated_credits,
            allowed = admission.allowed,
            will_overage = admission.will_overage,
            "admission checked"
        );
        Ok(admission)
    }

    /// Price a completed buffered request, debit the owner, and append the
    /// usage record, all in one transaction.
    ///
    /// Estimated usage is refused: only measured token counts are billed.
    pub async fn record_usage(
        &self,
        owner_id: i64,
        bot_id: i64,
        provider: ProviderKind,
        usage: &CompletionUsage,
    ) -> Result<UsageRecord, BytchatError> {
        if usage.is_estimated() {
            return Err(BytchatError::Internal(
                "refusing to bill estimated token usage".to_string(),
            ));
        }

        let mut record = UsageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            bot_id,
            provider,
            model: usage.model_used.clone(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.prompt_tokens.saturating_add(usage.completion_tokens),
            charged_credits: 0,
            overage_credits: 0,
            latency_ms: usage.latency_ms,
            created_at: now_timestamp(),
        };
        let seed = AccountSeed::new(PlanTier::Free, &self.presets, self.period_days);
        let pending = record.clone();

        let (account, charged, overage, source) = self
            .conn
            .call(move |conn| -> Result<(QuotaAccount, i64, i64, PriceSource), rusqlite::Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                seed.insert_if_missing(&tx, owner_id)?;
                let mut account =
                    load_account(&tx, owner_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;

                let provider_key = pending.provider.to_string();
                let (rate, source) = resolve_rate(&tx, &provider_key, &pending.model)?;
                let charge = rate.charge_credits(pending.prompt_tokens, pending.completion_tokens);
                let debit = account.split_charge(charge);
                account.apply(debit);

                tx.execute(
                    "UPDATE quota_accounts
                     SET credits_remaining = ?2, overage_used = ?3, overage_cost_usd = ?4
                     WHERE owner_id = ?1",
                    params![
                        owner_id,
                        account.credits_remaining,
                        account.overage_used,
                        account.overage_cost_usd
                    ],
                )?;
                tx.execute(
                    "INSERT INTO usage_records (id, owner_id, bot_id, provider, model,
                        prompt_tokens, completion_tokens, total_tokens, charged_credits,
                        overage_credits, latency_ms, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        pending.id,
                        pending.owner_id,
                        pending.bot_id,
                        provider_key,
                        pending.model,
                        pending.prompt_tokens,
                        pending.completion_tokens,
                        pending.total_tokens,
                        charge,
                        debit.overage,
                        pending.latency_ms as i64,
                        pending.created_at,
                    ],
                )?;
                tx.commit()?;
                Ok((account, charge, debit.overage, source))
            })
            .await
            .map_err(map_tr_err)?;

        record.charged_credits = charged;
        record.overage_credits = overage;

        info!(
            owner_id,
            bot_id,
            provider = %provider,
            model = %record.model,
            prompt_tokens = record.prompt_tokens,
            completion_tokens = record.completion_tokens,
            charged_credits = charged,
            overage_credits = overage,
            price_source = %source,
            credits_remaining = account.credits_remaining,
            "usage recorded"
        );
        if overage > 0 && account.over_cap() {
            warn!(
                owner_id,
                plan = %account.plan,
                overage_used = account.overage_used,
                overage_cap = account.overage_cap,
                "account overage exceeds declared cap"
            );
        }

        Ok(record)
    }

    /// Move an owner to another tier, starting a fresh period with a full
    /// allotment and cleared overage.
    pub async fn change_plan(
        &self,
        owner_id: i64,
        plan: PlanTier,
    ) -> Result<QuotaAccount, BytchatError> {
        let seed = AccountSeed::new(plan, &self.presets, self.period_days);
        let account = self
            .conn
            .call(move |conn| -> Result<QuotaAccount, rusqlite::Error> {
                seed.upsert(conn, owner_id)?;
                load_account(conn, owner_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
            })
            .await
            .map_err(map_tr_err)?;
        info!(owner_id, plan = %plan, credits = account.credits_included, "plan changed");
        Ok(account)
    }

    /// Credits used since `since` (an RFC 3339 timestamp or date prefix).
    pub async fn usage_summary(
        &self,
        owner_id: i64,
        since: &str,
    ) -> Result<UsageSummary, BytchatError> {
        let since = since.to_string();
        self.conn
            .call(move |conn| -> Result<UsageSummary, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT provider, COUNT(*), SUM(charged_credits), SUM(overage_credits)
                     FROM usage_records
                     WHERE owner_id = ?1 AND created_at >= ?2
                     GROUP BY provider",
                )?;
                let rows = stmt.query_map(params![owner_id, since], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })?;

                let mut summary = UsageSummary::default();
                for row in rows {
                    let (provider, requests, credits, overage) = row?;
                    summary.requests += requests;
                    summary.credits_used += credits;
                    summary.overage_credits += overage;
                    summary.by_provider.insert(provider, credits);
                }
                Ok(summary)
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Values for a new account row, computed outside the connection thread.
#[derive(Debug, Clone)]
struct AccountSeed {
    plan: PlanTier,
    monthly_price_cents: i64,
    credits: i64,
    overage_rate: f64,
    overage_cap: i64,
    period_start: String,
    period_end: String,
}

impl AccountSeed {
    fn new(plan: PlanTier, presets: &PlanPresets, period_days: u32) -> Self {
        let preset = plan.preset(presets);
        let now = chrono::Utc::now();
        let end = now + chrono::Duration::days(i64::from(period_days));
        let fmt = "%Y-%m-%dT%H:%M:%S%.3fZ";
        Self {
            plan,
            monthly_price_cents: preset.monthly_price_cents as i64,
            credits: preset.credits_included as i64,
            overage_rate: preset.overage_rate,
            overage_cap: preset.overage_cap as i64,
            period_start: now.format(fmt).to_string(),
            period_end: end.format(fmt).to_string(),
        }
    }

    fn insert_if_missing(
        &self,
        conn: &rusqlite::Connection,
        owner_id: i64,
    ) -> Result<(), rusqlite::Error> {
        let inserted = self.write(
            conn,
            owner_id,
            "INSERT OR IGNORE INTO quota_accounts (owner_id, plan, monthly_price_cents,
                credits_included, credits_remaining, overage_used, overage_rate, overage_cap,
                overage_cost_usd, period_start, period_end)
             VALUES (?1, ?2, ?3, ?4, ?4, 0, ?5, ?6, 0.0, ?7, ?8)",
        )?;
        if inserted > 0 {
            info!(owner_id, plan = %self.plan, credits = self.credits, "quota account created");
        }
        Ok(())
    }

    fn upsert(&self, conn: &rusqlite::Connection, owner_id: i64) -> Result<(), rusqlite::Error> {
        self.write(
            conn,
            owner_id,
            "INSERT INTO quota_accounts (owner_id, plan, monthly_price_cents,
                credits_included, credits_remaining, overage_used, overage_rate, overage_cap,
                overage_cost_usd, period_start, period_end)
             VALUES (?1, ?2, ?3, ?4, ?4, 0, ?5, ?6, 0.0, ?7, ?8)
             ON CONFLICT(owner_id) DO UPDATE SET
                plan = excluded.plan,
                monthly_price_cents = excluded.monthly_price_cents,
                credits_included = excluded.credits_included,
                credits_remaining = excluded.credits_remaining,
                overage_used = 0,
                overage_rate = excluded.overage_rate,
                overage_cap = excluded.overage_cap,
                overage_cost_usd = 0.0,
                period_start = excluded.period_start,
                period_end = excluded.period_end",
        )?;
        Ok(())
    }

    fn write(
        &self,
        conn: &rusqlite::Connection,
        owner_id: i64,
        sql: &str,
    ) -> Result<usize, rusqlite::Error> {
        conn.execute(
            sql,
            params![
                owner_id,
                self.plan.to_string(),
                self.monthly_price_cents,
                self.credits,
                self.overage_rate,
                self.overage_cap,
                self.period_start,
                self.period_end,
            ],
        )
    }
}

fn load_account(
    conn: &rusqlite::Connection,
    owner_id: i64,
) -> Result<Option<QuotaAccount>, rusqlite::Error> {
    conn.query_row(
        "SELECT owner_id, plan, monthly_price_cents, credits_included, credits_remaining,
                overage_used, overage_rate, overage_cap, overage_cost_usd, period_start, period_end
         FROM quota_accounts WHERE owner_id = ?1",
        params![owner_id],
        |row| {
            let plan: String = row.get(1)?;
            let plan = PlanTier::from_str(&plan).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?;
            Ok(QuotaAccount {
                owner_id: row.get(0)?,
                plan,
                monthly_price_cents: row.get(2)?,
                credits_included: row.get(3)?,
                credits_remaining: row.get(4)?,
                overage_used: row.get(5)?,
                overage_rate: row.get(6)?,
                overage_cap: row.get(7)?,
                overage_cost_usd: row.get(8)?,
                period_start: row.get(9)?,
                period_end: row.get(10)?,
            })
        },
    )
    .optional()
}
