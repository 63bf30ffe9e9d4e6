//! Local, non-authoritative inspection of access tokens.
//!
//! The signature is never checked here; the backend does that. Reading the
//! `exp` claim only lets callers skip requests that are bound to fail.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::types::AccessClaims;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is not a three-part JWT")]
    Segments,
    #[error("token payload is not base64url")]
    Base64,
    #[error("token payload is not a JSON object")]
    Payload,
    #[error("token has no numeric exp claim")]
    MissingExpiry,
}

pub fn decode_claims(token: &str) -> Result<AccessClaims, DecodeError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DecodeError::Segments);
    };

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| DecodeError::Base64)?;
    let value: Value = serde_json::from_slice(&decoded).map_err(|_| DecodeError::Payload)?;
    let object = value.as_object().ok_or(DecodeError::Payload)?;

    let exp = object
        .get("exp")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .ok_or(DecodeError::MissingExpiry)?;
    let sub = object.get("sub").and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    let name = object
        .get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(AccessClaims { exp, sub, name })
}

pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let claims = decode_claims(token).ok()?;
    Utc.timestamp_opt(claims.exp, 0).single()
}

/// Fails closed: anything undecodable counts as expired.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token) {
        Ok(claims) => now.timestamp() >= claims.exp,
        Err(err) => {
            tracing::debug!(error = %err, "treating undecodable access token as expired");
            true
        }
    }
}

pub fn subject(token: &str) -> Option<String> {
    decode_claims(token).ok().and_then(|claims| claims.sub)
}

/// Short, log-safe rendering of a credential.
pub fn mask(token: &str) -> String {
    if token.is_empty() {
        return "<empty>".into();
    }
    let prefix = token.chars().take(6).collect::<String>();
    format!("{}*** (len={})", prefix, token.len())
}
