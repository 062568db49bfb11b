//! Identity provider backed by the `mall-api` HTTP endpoints.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use mall_auth::{Credentials, IdentityError, IdentityProvider, LoginResponse, PrincipalRecord};

#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    api_url: String,
}

impl HttpIdentityProvider {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Check connectivity by hitting the health endpoint.
    pub async fn check_connectivity(&self) -> bool {
        let url = format!("{}/health", self.api_url);
        matches!(self.client.get(&url).send().await, Ok(r) if r.status().is_success())
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, IdentityError> {
        let url = format!("{}/auth/login", self.api_url);
        let resp = self
            .client
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(IdentityError::InvalidCredentials)
            }
            _ => decode(resp).await,
        }
    }

    async fn me(&self, token: &str) -> Result<PrincipalRecord, IdentityError> {
        let url = format!("{}/auth/me", self.api_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::Unauthorized),
            _ => decode(resp).await,
        }
    }
}

/// Decode a success body. Statuses that say nothing about the credential
/// (404, 408, 429, 5xx, ...) surface as `Transport` so callers keep it.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, IdentityError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(IdentityError::Transport(format!("server answered {status}: {body}")));
    }

    resp.json::<T>()
        .await
        .map_err(|e| IdentityError::Malformed(e.to_string()))
}
