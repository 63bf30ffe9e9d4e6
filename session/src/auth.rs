use reqwest::Method;
use serde_json::json;

use crate::{
    error::SessionError,
    gateway::{ApiClient, ApiRequest},
    types::{AuthResponse, LoginRequest, ProfileEnvelope, RegisterRequest, UserSummary},
};

impl ApiClient {
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, SessionError> {
        let response: AuthResponse = self
            .execute(&ApiRequest::post("/auth/login").json(request)?)
            .await?
            .json()?;
        self.session().establish(&response)?;
        Ok(response)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, SessionError> {
        let response: AuthResponse = self
            .execute(&ApiRequest::post("/auth/register").json(request)?)
            .await?
            .json()?;
        self.session().establish(&response)?;
        Ok(response)
    }

    /// Revokes the refresh token server-side. The local session is destroyed
    /// even when the backend call fails.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let Some(refresh_token) = self.session().store().get_refresh_token() else {
            self.session().end();
            return Ok(());
        };

        let request =
            ApiRequest::new(Method::POST, "/auth/logout").json(&json!({ "refreshToken": refresh_token }))?;
        let result = self.execute(&request).await.map(|_| ());
        if let Err(err) = &result {
            tracing::warn!(error = %err, "logout request failed; clearing local session anyway");
        }
        self.session().end();
        result
    }

    /// Fetches the authoritative profile and refreshes the cached copy.
    pub async fn profile(&self) -> Result<UserSummary, SessionError> {
        let envelope: ProfileEnvelope = self.get("/auth/me").await?;
        let user = envelope.into_user();
        self.session().remember_user(&user)?;
        Ok(user)
    }
}
