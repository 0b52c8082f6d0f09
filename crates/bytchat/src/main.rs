// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bytchat - a multi-tenant LLM gateway.
//!
//! Operator CLI: ask a bot a question through the full pipeline, validate
//! configuration, and manage model prices.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod ask;
mod check;
mod price;
mod wiring;

use std::path::PathBuf;

use bytchat_config::BytchatConfig;
use bytchat_core::ProviderKind;
use clap::{Parser, Subcommand};

/// Bytchat - a multi-tenant LLM gateway.
#[derive(Parser, Debug)]
#[command(name = "bytchat", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a bot a question and stream the answer to stdout.
    Ask {
        /// Bot to ask.
        #[arg(long)]
        bot: i64,
        /// Numeric owner id; omit to ask anonymously.
        #[arg(long)]
        owner: Option<i64>,
        /// Meter and bill the request (tracked owners only).
        #[arg(long)]
        metered: bool,
        /// The question.
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Validate configuration and open the database.
    CheckConfig,
    /// Inspect and manage the model price table.
    Price {
        #[command(subcommand)]
        action: PriceAction,
    },
}

#[derive(Subcommand, Debug)]
enum PriceAction {
    /// Show the resolved price of one model and its typical query cost.
    Show { provider: ProviderKind, model: String },
    /// List the admin-managed price rows.
    List,
    /// Set a price in USD per 1000 input and output tokens.
    Set {
        provider: ProviderKind,
        model: String,
        input_per_1k: f64,
        output_per_1k: f64,
    },
    /// Deactivate an admin price so lookups fall back to built-in prices.
    Clear { provider: ProviderKind, model: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            bytchat_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Commands::Ask {
            bot,
            owner,
            metered,
            query,
        } => ask::run_ask(&config, bot, owner, metered, &query.join(" ")).await,
        Commands::CheckConfig => check::run_check(&config).await,
        Commands::Price { action } => price::run_price(&config, action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<BytchatConfig, Vec<bytchat_config::ConfigError>> {
    match path {
        Some(path) => bytchat_config::load_and_validate_path(path),
        None => bytchat_config::load_and_validate(),
    }
}

/// Initialize the tracing subscriber; `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bytchat={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
