#![allow(dead_code)]
use std::sync::Arc;

use chrono::{Duration, Utc};
use httpmock::MockServer;
use joblinker_session::{
    ApiClient, HttpRefreshClient, MemoryTokenStore, SessionContext, TokenStore, UserRole,
    UserSummary,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};

pub const API_PREFIX: &str = "/api/v1";
const SIGNING_SECRET: &[u8] = b"integration-test-secret";

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    name: &'a str,
    exp: i64,
    jti: String,
}

/// Mints an HS256 access token the way the identity backend does.
pub fn access_token(sub: &str, ttl: Duration) -> String {
    let claims = Claims {
        sub,
        name: "Test User",
        exp: (Utc::now() + ttl).timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SIGNING_SECRET),
    )
    .expect("encode jwt")
}

pub fn fresh_token(sub: &str) -> String {
    access_token(sub, Duration::minutes(15))
}

pub fn expired_token(sub: &str) -> String {
    access_token(sub, Duration::minutes(-1))
}

pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn user_json(id: &str) -> Value {
    json!({
        "id": id,
        "email": format!("{}@example.com", id),
        "name": "Sam Seeker",
        "image_url": null,
        "role": "SEEKER"
    })
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

pub struct Harness {
    pub store: Arc<MemoryTokenStore>,
    pub session: Arc<SessionContext>,
    pub client: ApiClient,
}

pub fn harness(server: &MockServer) -> Harness {
    harness_with_store(server, Arc::new(MemoryTokenStore::new()))
}

pub fn harness_with_store(server: &MockServer, store: Arc<MemoryTokenStore>) -> Harness {
    let base_url = server.url(API_PREFIX);
    let http = reqwest::Client::new();
    let refresher = Arc::new(HttpRefreshClient::with_client(http.clone(), &base_url));
    let session = Arc::new(SessionContext::new(store.clone(), refresher));
    let client = ApiClient::with_client(http, &base_url, session.clone());
    Harness {
        store,
        session,
        client,
    }
}

pub fn seeded(access: &str, refresh: &str) -> Arc<MemoryTokenStore> {
    let store = Arc::new(MemoryTokenStore::new());
    store.set_tokens(access, refresh).expect("seed tokens");
    store
}
