use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Seeker,
    Employer,
}

/// Cached identity for fast rendering. The backend stays authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh responses arrive either flat or wrapped in a `data` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TokenPairEnvelope {
    Wrapped { data: TokenPair },
    Flat(TokenPair),
}

impl TokenPairEnvelope {
    pub(crate) fn into_pair(self) -> TokenPair {
        match self {
            TokenPairEnvelope::Wrapped { data } => data,
            TokenPairEnvelope::Flat(pair) => pair,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

impl AuthResponse {
    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn into_message(self, fallback: &str) -> String {
        self.detail
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileEnvelope {
    Wrapped { user: UserSummary },
    Bare(UserSummary),
}

impl ProfileEnvelope {
    pub(crate) fn into_user(self) -> UserSummary {
        match self {
            ProfileEnvelope::Wrapped { user } => user,
            ProfileEnvelope::Bare(user) => user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Point-in-time view of the persisted session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserSummary>,
}

impl Session {
    pub fn has_tokens(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }
}
