// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot and roster operations.

use std::str::FromStr;

use bytchat_core::{BotConfig, BytchatError, ProviderKind, RosterEntry, TaskType};
use rusqlite::{params, OptionalExtension};
use tracing::warn;

use crate::database::{map_tr_err, Database};

/// Insert a bot and return its id.
pub async fn create_bot(
    db: &Database,
    name: &str,
    system_prompt: Option<&str>,
) -> Result<i64, BytchatError> {
    let name = name.to_string();
    let system_prompt = system_prompt.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO bots (name, system_prompt) VALUES (?1, ?2)",
                params![name, system_prompt],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Append an entry to the end of a bot's roster.
pub async fn add_roster_entry(
    db: &Database,
    bot_id: i64,
    entry: &RosterEntry,
) -> Result<(), BytchatError> {
    let task_type = entry.task_type.to_string();
    let provider = entry.provider.to_string();
    let model_id = entry.model_id.clone();
    let active = entry.active;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO bot_models (bot_id, position, task_type, provider, model_id, active)
                 VALUES (?1,
                         (SELECT COALESCE(MAX(position), -1) + 1 FROM bot_models WHERE bot_id = ?1),
                         ?2, ?3, ?4, ?5)",
                params![bot_id, task_type, provider, model_id, active],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Toggle every roster entry of a bot that serves `model_id`.
///
/// Returns the number of entries changed.
pub async fn set_model_active(
    db: &Database,
    bot_id: i64,
    model_id: &str,
    active: bool,
) -> Result<usize, BytchatError> {
    let model_id = model_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE bot_models SET active = ?3 WHERE bot_id = ?1 AND model_id = ?2",
                params![bot_id, model_id, active],
            )
        })
        .await
        .map_err(map_tr_err)
}

struct RosterRow {
    task_type: String,
    provider: String,
    model_id: String,
    active: bool,
}

/// Load a bot with its roster in definition order.
///
/// Rows naming a provider this build does not know are skipped with a warning
/// rather than failing the whole bot.
pub async fn get_bot_config(db: &Database, bot_id: i64) -> Result<Option<BotConfig>, BytchatError> {
    let loaded = db
        .connection()
        .call(move |conn| -> Result<Option<(String, Option<String>, Vec<RosterRow>)>, rusqlite::Error> {
            let bot = conn
                .query_row(
                    "SELECT name, system_prompt FROM bots WHERE id = ?1",
                    params![bot_id],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
                )
                .optional()?;
            let Some((name, system_prompt)) = bot else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT task_type, provider, model_id, active FROM bot_models
                 WHERE bot_id = ?1 ORDER BY position, id",
            )?;
            let rows = stmt
                .query_map(params![bot_id], |row| {
                    Ok(RosterRow {
                        task_type: row.get(0)?,
                        provider: row.get(1)?,
                        model_id: row.get(2)?,
                        active: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some((name, system_prompt, rows)))
        })
        .await
        .map_err(map_tr_err)?;

    let Some((name, system_prompt, rows)) = loaded else {
        return Ok(None);
    };

    let roster = rows
        .into_iter()
        .filter_map(|row| match ProviderKind::from_str(&row.provider) {
            Ok(provider) => Some(RosterEntry {
                task_type: TaskType::parse(&row.task_type),
                provider,
                model_id: row.model_id,
                active: row.active,
            }),
            Err(_) => {
                warn!(bot_id, provider = %row.provider, model = %row.model_id, "skipping roster entry with unknown provider");
                None
            }
        })
        .collect();

    Ok(Some(BotConfig {
        bot_id,
        name,
        system_prompt: system_prompt.filter(|p| !p.trim().is_empty()),
        roster,
    }))
}
