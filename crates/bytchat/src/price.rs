// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bytchat price` command implementation.

use bytchat_config::BytchatConfig;
use bytchat_core::BytchatError;
use bytchat_quota::{PriceRate, PriceTable};

use crate::PriceAction;

pub async fn run_price(config: &BytchatConfig, action: PriceAction) -> Result<(), BytchatError> {
    let db = bytchat_storage::open(&config.storage).await?;
    let table = PriceTable::new(db.connection().clone());

    for line in apply(&table, action).await? {
        println!("{line}");
    }
    Ok(())
}

async fn apply(table: &PriceTable, action: PriceAction) -> Result<Vec<String>, BytchatError> {
    match action {
        PriceAction::Show { provider, model } => {
            let estimate = table.model_cost_estimate(provider, &model).await?;
            Ok(vec![format!(
                "{}/{}: ${}/1k in, ${}/1k out ({}); typical query ${} = {} credits",
                estimate.provider,
                estimate.model_id,
                estimate.rate.input_per_1k,
                estimate.rate.output_per_1k,
                estimate.source,
                estimate.cost_per_query_usd,
                estimate.credits_per_query
            )])
        }
        PriceAction::List => {
            let rows = table.list_prices().await?;
            if rows.is_empty() {
                return Ok(vec!["no admin prices set; built-in prices apply".to_string()]);
            }
            Ok(rows
                .into_iter()
                .map(|row| {
                    format!(
                        "{}/{}: ${}/1k in, ${}/1k out{}",
                        row.provider,
                        row.model_id,
                        row.input_cost_per_1k,
                        row.output_cost_per_1k,
                        if row.active { "" } else { " (inactive)" }
                    )
                })
                .collect())
        }
        PriceAction::Set {
            provider,
            model,
            input_per_1k,
            output_per_1k,
        } => {
            table
                .upsert_price(provider, &model, PriceRate::new(input_per_1k, output_per_1k))
                .await?;
            Ok(vec![format!("{provider}/{model}: price set")])
        }
        PriceAction::Clear { provider, model } => {
            let line = if table.deactivate_price(provider, &model).await? {
                format!("{provider}/{model}: admin price deactivated")
            } else {
                format!("{provider}/{model}: no admin price to deactivate")
            };
            Ok(vec![line])
        }
    }
}
