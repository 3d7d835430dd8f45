//! Supabase-compatible auth REST client

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{friendly_auth_error, AuthSession, AuthUser, CredentialVerifier};
use crate::error::{Error, Result};

/// Client for a hosted auth provider speaking the GoTrue `/auth/v1` API
#[derive(Clone)]
pub struct HostedVerifier {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl HostedVerifier {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl ProviderUser {
    fn into_user(self, fallback_email: &str) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
        }
    }

    /// Users are keyed by email locally, so accounts without one (phone
    /// sign-ups) cannot be served
    fn into_verified_user(self) -> Result<AuthUser> {
        match self.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => Ok(AuthUser {
                email: email.to_string(),
                id: self.id,
            }),
            _ => Err(Error::Auth(
                "Account has no email address".to_string(),
            )),
        }
    }
}

/// Token grant, or sign-up response (a session, or a bare user awaiting confirmation)
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<ProviderUser>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl SessionResponse {
    fn into_session(self, fallback_email: &str) -> Result<AuthSession> {
        let user = match (self.user, self.id) {
            (Some(user), _) => user.into_user(fallback_email),
            (None, Some(id)) => AuthUser {
                id,
                email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            },
            (None, None) => {
                return Err(Error::Auth(
                    "Auth provider response did not include a user".to_string(),
                ))
            }
        };
        Ok(AuthSession {
            access_token: self.access_token,
            user,
        })
    }
}

/// Error bodies vary between provider versions
#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Map a non-success provider response to an auth error
async fn provider_failure(response: Response) -> Error {
    let status = response.status();
    let body: ProviderError = response.json().await.unwrap_or_default();
    let message = body
        .error_description
        .or(body.msg)
        .or(body.message)
        .or(body.error)
        .unwrap_or_else(|| format!("Auth provider returned {}", status));
    debug!("Auth provider rejected request ({}): {}", status, message);
    friendly_auth_error(&message)
}

#[async_trait]
impl CredentialVerifier for HostedVerifier {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .http_client
            .post(self.url("token?grant_type=password"))
            .header("apikey", &self.api_key)
            .json(&Credentials { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            let err = provider_failure(response).await;
            warn!("Sign-in rejected for {}", email);
            return Err(err);
        }

        let session = response.json::<SessionResponse>().await?.into_session(email)?;
        if session.access_token.is_none() {
            return Err(Error::Auth("Auth provider did not issue a token".to_string()));
        }
        info!("Signed in {}", session.user.email);
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .http_client
            .post(self.url("signup"))
            .header("apikey", &self.api_key)
            .json(&Credentials { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_failure(response).await);
        }

        let session = response.json::<SessionResponse>().await?.into_session(email)?;
        info!("Registered {}", session.user.email);
        Ok(session)
    }

    async fn verify(&self, access_token: &str) -> Result<AuthUser> {
        let response = self
            .http_client
            .get(self.url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_failure(response).await);
        }

        let user: ProviderUser = response.json().await?;
        user.into_verified_user()
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .http_client
            .post(self.url("logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_failure(response).await);
        }
        Ok(())
    }
}
