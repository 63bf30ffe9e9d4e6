use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    error::SessionError,
    refresh::TokenRefresher,
    store::TokenStore,
    token,
    types::{AuthResponse, Session, UserSummary},
};

/// The one active session for a client context, shared by the request
/// gateway and the route guard.
pub struct SessionContext {
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    refresh_gate: Mutex<()>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn TokenStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn snapshot(&self) -> Session {
        self.store.snapshot()
    }

    pub fn current_user(&self) -> Option<UserSummary> {
        self.store.get_user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().has_tokens()
    }

    /// Installs the tokens and user returned by login or registration.
    pub fn establish(&self, response: &AuthResponse) -> Result<(), SessionError> {
        // A new login replaces whatever was there, including a cached user
        // belonging to someone else.
        self.store.clear_all()?;
        self.store
            .set_tokens(&response.access_token, &response.refresh_token)?;
        if let Some(user) = &response.user {
            self.store.set_user(user)?;
        }
        tracing::info!(
            user_id = response.user.as_ref().map(|u| u.id.as_str()).unwrap_or("<unknown>"),
            access_token = %token::mask(&response.access_token),
            "session established"
        );
        Ok(())
    }

    pub fn remember_user(&self, user: &UserSummary) -> Result<(), SessionError> {
        if !self.user_matches_access_token(user) {
            tracing::warn!(user_id = %user.id, "profile does not match the current access token; not caching");
            return Ok(());
        }
        self.store.set_user(user)?;
        Ok(())
    }

    /// Destroys the session. Storage failures are logged, never raised.
    pub fn end(&self) {
        match self.store.clear_all() {
            Ok(()) => tracing::info!("session cleared"),
            Err(err) => tracing::error!(error = %err, "failed to clear session"),
        }
    }

    /// Obtains a usable access token after `stale_access` was found expired or
    /// rejected.
    ///
    /// Concurrent callers are serialized: whoever arrives after a successful
    /// rotation reuses the new token instead of spending the (already
    /// consumed) refresh token again. On failure the session is cleared.
    pub async fn renew(&self, stale_access: Option<&str>) -> Result<String, SessionError> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.store.get_access_token() {
            if Some(current.as_str()) != stale_access && !token::is_expired(&current) {
                tracing::debug!("access token already rotated by a concurrent refresh");
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.store.get_refresh_token() else {
            tracing::debug!("no refresh token available; ending session");
            self.end();
            return Err(SessionError::RefreshFailed(
                "No refresh token available".into(),
            ));
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(pair) => {
                if !self.store.rotate_tokens(&refresh_token, &pair)? {
                    tracing::warn!("session changed while refreshing; discarding refreshed tokens");
                    return match self.store.get_access_token() {
                        Some(current) => Ok(current),
                        None => Err(SessionError::RefreshFailed(
                            "Session ended during refresh".into(),
                        )),
                    };
                }
                self.drop_mismatched_user(&pair.access_token);
                tracing::debug!(access_token = %token::mask(&pair.access_token), "token pair rotated");
                Ok(pair.access_token)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                if self.store.get_refresh_token().as_deref() == Some(refresh_token.as_str()) {
                    self.end();
                }
                Err(match err {
                    SessionError::RefreshFailed(_) => err,
                    other => SessionError::RefreshFailed(other.to_string()),
                })
            }
        }
    }

    fn user_matches_access_token(&self, user: &UserSummary) -> bool {
        match self
            .store
            .get_access_token()
            .and_then(|access| token::subject(&access))
        {
            Some(sub) => sub == user.id,
            None => true,
        }
    }

    fn drop_mismatched_user(&self, access_token: &str) {
        let (Some(user), Some(sub)) = (self.store.get_user(), token::subject(access_token)) else {
            return;
        };
        if user.id != sub {
            tracing::warn!(cached = %user.id, subject = %sub, "cached user does not match token subject");
            if let Err(err) = self.store.clear_user() {
                tracing::error!(error = %err, "failed to drop stale cached user");
            }
        }
    }
}
