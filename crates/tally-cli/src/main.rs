//! Tally CLI - Bank statement categorizer
//!
//! Usage:
//!   tally init                       Initialize database
//!   tally import --file STATEMENT    Import a statement (CSV, text or PDF)
//!   tally patterns add TEXT CATEGORY Teach a pattern
//!   tally serve --port 3000          Start web server

mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tally_core::{Config, ImportOptions};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    let db_path = commands::resolve_db_path(cli.db.as_deref(), &config);

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path, cli.no_encrypt),
        Commands::Import {
            file,
            format,
            no_keywords,
        } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let mut options = ImportOptions::from_config(&config);
            if no_keywords {
                options.keyword_defaults = false;
            }
            commands::cmd_import(&db, &cli.user, &file, format.as_deref(), options)
        }
        Commands::Patterns { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            match action {
                None | Some(PatternsAction::List) => commands::cmd_patterns_list(&db, &cli.user),
                Some(PatternsAction::Add { pattern, category }) => {
                    commands::cmd_patterns_add(&db, &cli.user, &pattern, &category)
                }
                Some(PatternsAction::Delete { id }) => {
                    commands::cmd_patterns_delete(&db, &cli.user, id)
                }
                Some(PatternsAction::Test { description }) => commands::cmd_patterns_test(
                    &db,
                    &cli.user,
                    &description,
                    config.keyword_defaults,
                ),
            }
        }
        Commands::Statements { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            match action {
                None | Some(StatementsAction::List) => {
                    commands::cmd_statements_list(&db, &cli.user)
                }
                Some(StatementsAction::Show { id }) => {
                    commands::cmd_statements_show(&db, &cli.user, id)
                }
                Some(StatementsAction::Delete { id }) => {
                    commands::cmd_statements_delete(&db, &cli.user, id)
                }
            }
        }
        Commands::Correct {
            transaction_id,
            category,
            pattern,
        } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            commands::cmd_correct(
                &db,
                &cli.user,
                transaction_id,
                &category,
                pattern.as_deref(),
            )
        }
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&db_path, &host, port, no_auth, cli.no_encrypt, &config).await,
    }
}
