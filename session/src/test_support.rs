use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::types::{UserRole, UserSummary};

pub fn token_with_payload(payload: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}

pub fn access_token_for(sub: &str, ttl: Duration) -> String {
    token_with_payload(json!({
        "sub": sub,
        "name": "Test User",
        "exp": (Utc::now() + ttl).timestamp(),
    }))
}

pub fn fresh_access_token(sub: &str) -> String {
    access_token_for(sub, Duration::minutes(15))
}

pub fn expired_access_token(sub: &str) -> String {
    access_token_for(sub, Duration::minutes(-5))
}

pub fn seeker(id: &str) -> UserSummary {
    UserSummary {
        id: id.into(),
        email: format!("{}@example.com", id),
        name: "Sam Seeker".into(),
        image_url: None,
        role: Some(UserRole::Seeker),
    }
}
