// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bytchat ask` command implementation.

use std::io::Write;

use bytchat_config::BytchatConfig;
use bytchat_core::{BytchatError, OwnerIdentity};
use futures::StreamExt;
use tracing::debug;

use crate::wiring;

/// Token identifying anonymous CLI callers in logs.
const CLI_VISITOR: &str = "cli";

/// Run one query through the pipeline, writing fragments to stdout as they
/// arrive.
pub async fn run_ask(
    config: &BytchatConfig,
    bot_id: i64,
    owner: Option<i64>,
    metered: bool,
    query: &str,
) -> Result<(), BytchatError> {
    let runtime = wiring::build(config).await?;
    let owner = owner_identity(owner);
    debug!(owner = %owner, bot_id, metered, "asking");

    let mut answer = runtime.orchestrator.handle_query(owner, bot_id, query, metered);
    let mut stdout = std::io::stdout();
    while let Some(fragment) = answer.next().await {
        stdout
            .write_all(fragment.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|e| BytchatError::Internal(format!("failed to write answer: {e}")))?;
    }
    let _ = writeln!(stdout);

    #[cfg(feature = "prometheus")]
    if let Some(metrics) = &runtime.metrics {
        eprint!("{}", metrics.render());
    }

    runtime.db.checkpoint().await?;
    Ok(())
}

fn owner_identity(owner: Option<i64>) -> OwnerIdentity {
    match owner {
        Some(id) => OwnerIdentity::Tracked(id),
        None => OwnerIdentity::Anonymous(CLI_VISITOR.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_owner_is_anonymous() {
        assert_eq!(owner_identity(Some(4)), OwnerIdentity::Tracked(4));
        assert!(owner_identity(None).tracked_id().is_none());
    }
}
