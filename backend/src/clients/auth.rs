//! Session verification against the hosted auth service.
//!
//! The admin API receives the caller's access token as a bearer token; the
//! verifier turns it into the auth subject id, which is then looked up in the
//! user profile table for authorization.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use super::{check_status, http_client, ClientError, ClientResult};

#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Resolve an access token to the subject id it was issued for.
    async fn verify(&self, token: &str) -> ClientResult<String>;
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Verifier calling `GET {base}/auth/v1/user` with the caller's token.
pub struct HttpSessionVerifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpSessionVerifier {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(10),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SessionVerifier for HttpSessionVerifier {
    async fn verify(&self, token: &str) -> ClientResult<String> {
        if self.base_url.is_empty() {
            return Err(ClientError::Configuration(
                "Auth URL is not configured".to_string(),
            ));
        }
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await?;
        let response = match check_status("Auth", response).await {
            Err(ClientError::Status { status: 400, body }) => {
                return Err(ClientError::Unauthorized(body))
            }
            other => other?,
        };
        let user = response.json::<AuthUser>().await?;
        Ok(user.id)
    }
}

/// Fixed token → subject map, configured under `[auth.static_tokens]`.
#[derive(Debug, Default, Clone)]
pub struct StaticSessionVerifier {
    tokens: HashMap<String, String>,
}

impl StaticSessionVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), subject.into());
        self
    }
}

#[async_trait]
impl SessionVerifier for StaticSessionVerifier {
    async fn verify(&self, token: &str) -> ClientResult<String> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| ClientError::Unauthorized("Unknown session token".to_string()))
    }
}
