//! Credential verification against an external auth provider
//!
//! # Architecture
//!
//! - `CredentialVerifier` trait: sign in, sign up, verify a bearer token, sign out
//! - `AuthClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Implementations: `HostedVerifier` (Supabase-compatible REST API) and
//!   `MemoryVerifier` (accounts held in process, for tests and local use)
//!
//! # Configuration
//!
//! Environment variables:
//! - `TALLY_AUTH_URL` / `SUPABASE_URL`: provider base URL
//! - `TALLY_AUTH_KEY` / `SUPABASE_KEY`: provider public API key

mod hosted;
mod memory;

pub use hosted::HostedVerifier;
pub use memory::MemoryVerifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

/// An authenticated user as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Result of a sign-in or sign-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Absent when the provider still requires email confirmation
    pub access_token: Option<String>,
    pub user: AuthUser,
}

/// Interface to the service that owns user identity
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Resolve a bearer token to its user
    async fn verify(&self, access_token: &str) -> Result<AuthUser>;

    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

/// Check sign-up input before it reaches the provider
pub fn validate_signup(email: &str, password: &str, confirm: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidData("A valid email is required".to_string()));
    }
    if password != confirm {
        return Err(Error::InvalidData("Passwords do not match".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidData(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Turn a provider error message into the message shown to users
pub fn friendly_auth_error(message: &str) -> Error {
    let lower = message.to_lowercase();
    if lower.contains("invalid") || lower.contains("credentials") {
        Error::Auth("Invalid email or password".to_string())
    } else if lower.contains("already") {
        Error::Auth("Email already registered".to_string())
    } else {
        Error::Auth(message.to_string())
    }
}

/// Verifier wrapper providing Clone and static dispatch
#[derive(Clone)]
pub enum AuthClient {
    Hosted(HostedVerifier),
    Memory(MemoryVerifier),
}

impl AuthClient {
    /// Hosted verifier from configuration; a config error when credentials are missing
    pub fn from_config(config: &Config) -> Result<Self> {
        let auth = config.require_auth()?;
        Ok(Self::Hosted(HostedVerifier::new(&auth.url, &auth.api_key)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hosted(_) => "hosted",
            Self::Memory(_) => "memory",
        }
    }
}

#[async_trait]
impl CredentialVerifier for AuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        match self {
            Self::Hosted(v) => v.sign_in(email, password).await,
            Self::Memory(v) => v.sign_in(email, password).await,
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        match self {
            Self::Hosted(v) => v.sign_up(email, password).await,
            Self::Memory(v) => v.sign_up(email, password).await,
        }
    }

    async fn verify(&self, access_token: &str) -> Result<AuthUser> {
        match self {
            Self::Hosted(v) => v.verify(access_token).await,
            Self::Memory(v) => v.verify(access_token).await,
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        match self {
            Self::Hosted(v) => v.sign_out(access_token).await,
            Self::Memory(v) => v.sign_out(access_token).await,
        }
    }
}
