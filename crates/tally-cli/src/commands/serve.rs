//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{AuthClient, Config, ImportOptions};

use super::open_db;

/// Server settings from configuration and flags
pub fn server_config(config: &Config, no_auth: bool) -> Result<tally_server::ServerConfig> {
    let auth = if no_auth {
        AuthClient::from_config(config).ok()
    } else {
        Some(AuthClient::from_config(config).context(
            "Authentication is enabled; set TALLY_AUTH_URL and TALLY_AUTH_KEY or use --no-auth",
        )?)
    };

    Ok(tally_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        auth,
        import: ImportOptions::from_config(config),
    })
}

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    config: &Config,
) -> Result<()> {
    let server_config = server_config(config, no_auth)?;

    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    if no_auth {
        println!();
        println!(
            "   ⚠️  Authentication DISABLED - every request runs as '{}'",
            tally_server::LOCAL_DEV_USER
        );
    } else if let Some(auth) = &config.auth {
        println!("   🔒 Authentication: {}", auth.url);
    }
    if !config.keyword_defaults {
        println!("   Keyword defaults: DISABLED");
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    tally_server::serve_with_config(db, host, port, server_config).await?;

    Ok(())
}
