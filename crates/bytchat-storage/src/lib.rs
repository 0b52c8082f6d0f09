// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Bytchat gateway.
//!
//! WAL-mode storage with embedded migrations and a single-writer model via
//! `tokio-rusqlite`. The schema covers bots and rosters, the per-tenant chunk
//! index, quota accounts, usage records, and model pricing; the retrieval and
//! quota crates share the same connection handle.

pub mod database;
pub mod directory;
pub mod migrations;
pub mod queries;

pub use database::{map_tr_err, Database};
pub use directory::SqliteBotDirectory;

use bytchat_config::model::StorageConfig;
use bytchat_core::BytchatError;

/// Open the database described by the storage section.
pub async fn open(config: &StorageConfig) -> Result<Database, BytchatError> {
    Database::open(&config.database_path, config.wal_mode).await
}
