// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`BotDirectory`] seam.

use async_trait::async_trait;
use bytchat_core::{
    AdapterType, BotConfig, BotDirectory, BytchatError, HealthStatus, PluginAdapter,
};
use tracing::debug;

use crate::database::Database;
use crate::queries;

/// Reads bots and rosters from the `bots` / `bot_models` tables.
#[derive(Clone)]
pub struct SqliteBotDirectory {
    db: Database,
}

impl SqliteBotDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteBotDirectory {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BytchatError> {
        match self.db.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), BytchatError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl BotDirectory for SqliteBotDirectory {
    async fn bot_config(&self, bot_id: i64) -> Result<Option<BotConfig>, BytchatError> {
        let bot = queries::bots::get_bot_config(&self.db, bot_id).await?;
        debug!(bot_id, found = bot.is_some(), "bot lookup");
        Ok(bot)
    }
}
