//! In-process verifier for tests and local development
//!
//! Accounts and sessions live in the verifier instance; nothing is shared
//! between instances. Sessions are only dropped by `sign_out`, so the session
//! map grows for the life of the process. Not meant for production traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use subtle::ConstantTimeEq;

use super::{AuthSession, AuthUser, CredentialVerifier};
use crate::error::{Error, Result};

struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Default)]
struct State {
    /// Keyed by lowercased email
    accounts: HashMap<String, Account>,
    /// Access token -> user
    sessions: HashMap<String, AuthUser>,
}

/// Credential verifier holding accounts in memory
#[derive(Clone, Default)]
pub struct MemoryVerifier {
    state: Arc<Mutex<State>>,
    counter: Arc<AtomicU64>,
}

impl MemoryVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account up front (builder style)
    pub fn with_account(self, email: &str, password: &str) -> Self {
        {
            let mut state = self.lock();
            let id = format!("mem-user-{}", state.accounts.len() + 1);
            state.accounts.insert(
                email.to_lowercase(),
                Account {
                    user: AuthUser {
                        id,
                        email: email.to_string(),
                    },
                    password: password.to_string(),
                },
            );
        }
        self
    }

    /// Issue a token without a password check (tests)
    pub fn issue_token(&self, user: &AuthUser) -> String {
        let token = self.next_token(&user.id);
        self.lock().sessions.insert(token.clone(), user.clone());
        token
    }

    // A poisoned lock only means a panic mid-update; the maps are still consistent
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_token(&self, user_id: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("mem-{}-{}", user_id, n)
    }
}

#[async_trait]
impl CredentialVerifier for MemoryVerifier {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let user = {
            let state = self.lock();
            let account = state.accounts.get(&email.to_lowercase());
            let matches = account
                .map(|a| bool::from(a.password.as_bytes().ct_eq(password.as_bytes())))
                .unwrap_or(false);
            match (account, matches) {
                (Some(account), true) => account.user.clone(),
                _ => return Err(Error::Auth("Invalid email or password".to_string())),
            }
        };

        let token = self.issue_token(&user);
        Ok(AuthSession {
            access_token: Some(token),
            user,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        let user = {
            let mut state = self.lock();
            let key = email.to_lowercase();
            if state.accounts.contains_key(&key) {
                return Err(Error::Auth("Email already registered".to_string()));
            }
            let user = AuthUser {
                id: format!("mem-user-{}", state.accounts.len() + 1),
                email: email.to_string(),
            };
            state.accounts.insert(
                key,
                Account {
                    user: user.clone(),
                    password: password.to_string(),
                },
            );
            user
        };

        let token = self.issue_token(&user);
        Ok(AuthSession {
            access_token: Some(token),
            user,
        })
    }

    async fn verify(&self, access_token: &str) -> Result<AuthUser> {
        let state = self.lock();
        state
            .sessions
            .iter()
            .find(|(token, _)| bool::from(token.as_bytes().ct_eq(access_token.as_bytes())))
            .map(|(_, user)| user.clone())
            .ok_or_else(|| Error::Auth("Invalid or expired token".to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.lock().sessions.remove(access_token);
        Ok(())
    }
}
