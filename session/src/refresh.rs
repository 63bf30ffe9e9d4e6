use async_trait::async_trait;
use reqwest::Client;

use crate::{
    config::SessionConfig,
    error::SessionError,
    gateway::build_http_client,
    types::{ApiErrorBody, RefreshRequest, TokenPair, TokenPairEnvelope},
};

pub const REFRESH_PATH: &str = "/auth/refresh";

/// Exchanges one refresh token for a new pair. Implementations make exactly
/// one attempt; retry policy belongs to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError>;
}

#[derive(Debug, Clone)]
pub struct HttpRefreshClient {
    client: Client,
    refresh_url: String,
}

impl HttpRefreshClient {
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        Ok(Self::with_client(
            build_http_client(config)?,
            &config.api_base_url,
        ))
    }

    pub fn with_client(client: Client, api_base_url: &str) -> Self {
        Self {
            client,
            refresh_url: format!("{}{}", api_base_url.trim_end_matches('/'), REFRESH_PATH),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefreshClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        // The refresh token travels in the body only, never as a bearer.
        let response = self
            .client
            .post(&self.refresh_url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|e| SessionError::RefreshFailed(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::RefreshFailed(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = ApiErrorBody::from_slice(&body).into_message("Token refresh failed");
            tracing::warn!(status = status.as_u16(), %message, "refresh rejected by identity backend");
            return Err(SessionError::RefreshFailed(message));
        }

        let envelope: TokenPairEnvelope = serde_json::from_slice(&body).map_err(|e| {
            SessionError::RefreshFailed(format!("Failed to parse refresh response: {}", e))
        })?;
        let pair = envelope.into_pair();
        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(SessionError::RefreshFailed(
                "Refresh response did not include a token pair".into(),
            ));
        }
        Ok(pair)
    }
}
