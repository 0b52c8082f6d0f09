// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot configuration lookup.

use async_trait::async_trait;

use crate::error::BytchatError;
use crate::types::BotConfig;

/// Read access to bot configurations and their model rosters.
#[async_trait]
pub trait BotDirectory: Send + Sync {
    /// Load a bot with its ordered roster, or `None` if the bot does not exist.
    async fn bot_config(&self, bot_id: i64) -> Result<Option<BotConfig>, BytchatError>;
}
