//! Runtime configuration read from the environment

use crate::error::{Error, Result};

/// Database connection string (`sqlite://path` or a plain path)
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Base URL of the hosted auth provider
pub const AUTH_URL_ENV: &str = "TALLY_AUTH_URL";

/// Public API key sent to the hosted auth provider
pub const AUTH_KEY_ENV: &str = "TALLY_AUTH_KEY";

/// Accepted in place of `TALLY_AUTH_URL` / `TALLY_AUTH_KEY`
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_KEY_ENV: &str = "SUPABASE_KEY";

/// Set to `0`/`false`/`off` to disable the built-in keyword fallback
pub const KEYWORD_DEFAULTS_ENV: &str = "TALLY_KEYWORD_DEFAULTS";

pub const DEFAULT_DATABASE_PATH: &str = "tally.db";

/// Credentials for the hosted auth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: String,
    /// None when neither credential is set
    pub auth: Option<AuthConfig>,
    pub keyword_defaults: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            auth: None,
            keyword_defaults: true,
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup (used by tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_path = match get(DATABASE_URL_ENV) {
            Some(url) => database_path_from_url(&url)?,
            None => DEFAULT_DATABASE_PATH.to_string(),
        };

        let url = get(AUTH_URL_ENV).or_else(|| get(SUPABASE_URL_ENV));
        let api_key = get(AUTH_KEY_ENV).or_else(|| get(SUPABASE_KEY_ENV));
        let auth = match (url, api_key) {
            (Some(url), Some(api_key)) => Some(AuthConfig {
                url: url.trim().trim_end_matches('/').to_string(),
                api_key: api_key.trim().to_string(),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::Config(format!(
                    "{} is set but {} is missing",
                    AUTH_URL_ENV, AUTH_KEY_ENV
                )))
            }
            (None, Some(_)) => {
                return Err(Error::Config(format!(
                    "{} is set but {} is missing",
                    AUTH_KEY_ENV, AUTH_URL_ENV
                )))
            }
        };

        let keyword_defaults = match get(KEYWORD_DEFAULTS_ENV) {
            Some(v) => !matches!(
                v.trim().to_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            ),
            None => true,
        };

        Ok(Self {
            database_path,
            auth,
            keyword_defaults,
        })
    }

    /// Auth credentials, or a configuration error naming the missing variables
    pub fn require_auth(&self) -> Result<&AuthConfig> {
        self.auth.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "Missing authentication configuration. Set {} and {} (or {} and {})",
                AUTH_URL_ENV, AUTH_KEY_ENV, SUPABASE_URL_ENV, SUPABASE_KEY_ENV
            ))
        })
    }
}

/// Turn a `DATABASE_URL` value into a SQLite file path
pub fn database_path_from_url(url: &str) -> Result<String> {
    let url = url.trim();
    let lower = url.to_lowercase();

    if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
        return Err(Error::Config(format!(
            "{} points at PostgreSQL; only SQLite databases are supported",
            DATABASE_URL_ENV
        )));
    }

    let path = ["sqlite://", "sqlite:", "file:"]
        .iter()
        .find_map(|prefix| {
            lower
                .starts_with(prefix)
                .then(|| &url[prefix.len()..])
        })
        .unwrap_or(url);

    if path.is_empty() {
        return Err(Error::Config(format!("{} has no path", DATABASE_URL_ENV)));
    }

    Ok(path.to_string())
}
