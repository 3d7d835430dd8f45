//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Categorize bank statements and learn from corrections
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Bank statement categorizer with learned patterns", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (overrides DATABASE_URL; defaults to tally.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// User whose statements and patterns the command works on
    #[arg(long, default_value = "local", global = true)]
    pub user: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import a bank statement (CSV, text or PDF)
    Import {
        /// Statement file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Document format: csv, text, pdf (detected if not specified)
        #[arg(long)]
        format: Option<String>,

        /// Skip the built-in keyword table for rows no pattern matches
        #[arg(long)]
        no_keywords: bool,
    },

    /// Manage learned patterns (list, add, delete, test)
    Patterns {
        #[command(subcommand)]
        action: Option<PatternsAction>,
    },

    /// Manage imported statements (list, show, delete)
    Statements {
        #[command(subcommand)]
        action: Option<StatementsAction>,
    },

    /// Correct a transaction's category and learn a pattern from it
    Correct {
        /// Transaction ID
        transaction_id: i64,

        /// New category (e.g., MCA_DEBT, RENT, PAYROLL)
        category: String,

        /// Pattern text to learn (defaults to the full description)
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server verifies bearer tokens with the auth provider
        /// configured by TALLY_AUTH_URL and TALLY_AUTH_KEY.
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
pub enum PatternsAction {
    /// List learned patterns
    List,

    /// Teach a pattern (re-adding the same text updates it)
    Add {
        /// Text to look for in descriptions (case-insensitive)
        pattern: String,
        /// Category to assign (e.g., MCA_DEBT)
        category: String,
    },

    /// Delete a pattern
    Delete {
        /// Pattern ID
        id: i64,
    },

    /// Show how a description would be categorized
    Test {
        /// Transaction description
        description: String,
    },
}

#[derive(Subcommand)]
pub enum StatementsAction {
    /// List imported statements
    List,

    /// Show a statement and its transactions
    Show {
        /// Statement ID
        id: i64,
    },

    /// Delete a statement and its transactions
    Delete {
        /// Statement ID
        id: i64,
    },
}
