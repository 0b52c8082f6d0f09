// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory bot directory.

use std::collections::HashMap;

use async_trait::async_trait;
use bytchat_core::{BotConfig, BotDirectory, BytchatError, RosterEntry};

/// Serves bots from a map; can be told to fail every lookup.
#[derive(Default)]
pub struct StaticBotDirectory {
    bots: HashMap<i64, BotConfig>,
    failing: bool,
}

impl StaticBotDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory whose backend is down.
    pub fn failing() -> Self {
        Self {
            bots: HashMap::new(),
            failing: true,
        }
    }

    /// Add a bot without its own system prompt.
    pub fn with_bot(mut self, bot_id: i64, roster: Vec<RosterEntry>) -> Self {
        self.bots.insert(
            bot_id,
            BotConfig {
                bot_id,
                name: format!("bot-{bot_id}"),
                system_prompt: None,
                roster,
            },
        );
        self
    }

    pub fn with_config(mut self, config: BotConfig) -> Self {
        self.bots.insert(config.bot_id, config);
        self
    }
}

#[async_trait]
impl BotDirectory for StaticBotDirectory {
    async fn bot_config(&self, bot_id: i64) -> Result<Option<BotConfig>, BytchatError> {
        if self.failing {
            return Err(BytchatError::Storage {
                source: Box::new(std::io::Error::other("bot directory unavailable")),
            });
        }
        Ok(self.bots.get(&bot_id).cloned())
    }
}
