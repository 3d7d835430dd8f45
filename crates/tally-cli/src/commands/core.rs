//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `ensure_local_user` - Record the CLI user before touching their data
//! - `cmd_init` - Initialize the database

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::{db::Database, Config};
use tracing::debug;

/// `--db` wins over `DATABASE_URL`, which wins over the default path
pub fn resolve_db_path(cli_db: Option<&Path>, config: &Config) -> PathBuf {
    cli_db
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.database_path))
}

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    debug!(path = %path_str, encrypted = !no_encrypt, "Opening database");
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Make sure the CLI user exists so statements and patterns can reference it
pub fn ensure_local_user(db: &Database, user_id: &str) -> Result<()> {
    db.ensure_user(user_id, &format!("{}@localhost", user_id))
        .with_context(|| format!("Failed to record user '{}'", user_id))?;
    Ok(())
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let _db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Teach a pattern: tally patterns add \"DAILY ACH\" MCA_DEBT");
    println!("  2. Import a statement: tally import --file statement.csv");
    println!("  3. Start the API: tally serve");

    Ok(())
}
