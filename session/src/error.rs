use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write session store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    /// Authorization failure that could not be recovered locally.
    #[error("unauthorized: {detail}")]
    Unauthorized {
        detail: String,
        sign_in_required: bool,
    },
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to parse response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl SessionError {
    /// True when the session is gone and the UI should send the user to sign in.
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            SessionError::Unauthorized {
                sign_in_required: true,
                ..
            }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Unauthorized { .. } => Some(401),
            SessionError::Api { status, .. } => Some(*status),
            SessionError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
