// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded SQL migrations, compiled in via refinery.

use bytchat_core::BytchatError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply every pending migration. Refinery records progress in
/// `refinery_schema_history`, so this is safe to call on each open.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), BytchatError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| BytchatError::Storage {
            source: Box::new(e),
        })?;
    for migration in report.applied_migrations() {
        tracing::info!(version = migration.version(), name = %migration.name(), "migration applied");
    }
    Ok(())
}
