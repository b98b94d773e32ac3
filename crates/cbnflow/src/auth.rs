//! Bearer token acquisition.

use std::time::Duration;

use async_trait::async_trait;

use crate::client::{check, user_agent};
use crate::error::{AuthError, ClientError};
use crate::protocol::TokenResponse;

/// Source of the bearer token used for every service call.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Result<String, AuthError>;
}

/// A token known up front (tests, or tokens minted elsewhere).
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// OAuth resource-owner password grant.
pub struct PasswordGrant {
    auth_url: String,
    username: String,
    password: String,
    client_id: String,
    timeout: Duration,
}

impl PasswordGrant {
    pub fn new(
        auth_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            username: username.into(),
            password: password.into(),
            client_id: client_id.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("grant_type", "password".to_string()),
            ("username", self.username.clone()),
            ("password", self.password.clone()),
            ("scope", format!("openid {} offline_access", self.client_id)),
            ("client_id", self.client_id.clone()),
            ("response_type", "token id_token".to_string()),
        ]
    }
}

impl std::fmt::Debug for PasswordGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGrant")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialProvider for PasswordGrant {
    async fn token(&self) -> Result<String, AuthError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent())
            .timeout(self.timeout)
            .build()
            .map_err(ClientError::from)?;

        let response = client
            .post(&self.auth_url)
            .form(&self.form())
            .send()
            .await
            .map_err(ClientError::from)?;

        let body: TokenResponse = check(response)
            .await?
            .json()
            .await
            .map_err(ClientError::from)?;

        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        tracing::info!(username = %self.username, "Authentication successful");
        Ok(token)
    }
}
