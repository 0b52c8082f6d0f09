// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory database and quota ledger for pipeline tests.

use std::sync::Arc;

use bytchat_config::BytchatConfig;
use bytchat_core::BytchatError;
use bytchat_quota::{PlanTier, QuotaAccount, QuotaLedger};
use bytchat_storage::{map_tr_err, Database};
use tracing::debug;

/// Owns a migrated in-memory database with a ledger on top.
pub struct TestHarness {
    pub config: BytchatConfig,
    pub db: Database,
    pub ledger: Arc<QuotaLedger>,
}

impl TestHarness {
    pub async fn new() -> Result<Self, BytchatError> {
        Self::with_config(BytchatConfig::default()).await
    }

    pub async fn with_config(config: BytchatConfig) -> Result<Self, BytchatError> {
        let db = Database::open_in_memory().await?;
        let ledger = Arc::new(QuotaLedger::new(db.connection().clone(), &config.quota));
        Ok(Self { config, db, ledger })
    }

    /// Create (or reset) an account on `plan` and force its balance.
    pub async fn account_with_credits(
        &self,
        owner_id: i64,
        plan: PlanTier,
        credits_remaining: i64,
    ) -> Result<QuotaAccount, BytchatError> {
        self.ledger.change_plan(owner_id, plan).await?;
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "UPDATE quota_accounts SET credits_remaining = ?2 WHERE owner_id = ?1",
                    rusqlite::params![owner_id, credits_remaining],
                )
            })
            .await
            .map_err(map_tr_err)?;
        debug!(owner_id, credits_remaining, "test account prepared");
        self.ledger
            .account(owner_id)
            .await?
            .ok_or_else(|| BytchatError::Internal(format!("account {owner_id} vanished")))
    }

    /// Drop the usage table so the next debit fails.
    pub async fn break_usage_table(&self) -> Result<(), BytchatError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("DROP TABLE usage_records")
            })
            .await
            .map_err(map_tr_err)
    }

    /// Drop the account table so admission cannot read the ledger.
    pub async fn break_account_table(&self) -> Result<(), BytchatError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("DROP TABLE quota_accounts")
            })
            .await
            .map_err(map_tr_err)
    }

    /// Number of usage records for an owner.
    pub async fn usage_count(&self, owner_id: i64) -> Result<i64, BytchatError> {
        self.db
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM usage_records WHERE owner_id = ?1",
                    [owner_id],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }
}
