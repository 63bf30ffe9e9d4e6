use std::time::Duration;

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use crate::types::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookiePolicy {
    pub fn for_environment(is_production: bool) -> Self {
        Self {
            secure: is_production,
            same_site: SameSite::Lax,
        }
    }
}

pub const ACCESS_COOKIE_NAME: &str = "job_linker_access_token";
pub const REFRESH_COOKIE_NAME: &str = "job_linker_refresh_token";
pub const USER_COOKIE_NAME: &str = "user";
pub const COOKIE_PATH: &str = "/";

pub const ACCESS_TOKEN_MAX_AGE: Duration = Duration::from_secs(15 * 60);
pub const REFRESH_TOKEN_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// The gateway attaches the bearer itself, so the access token and the user
// cookie stay script-readable. Only the refresh token is HttpOnly.
pub fn access_cookie(token: &str, policy: CookiePolicy) -> String {
    build_cookie(ACCESS_COOKIE_NAME, token, ACCESS_TOKEN_MAX_AGE, false, policy)
}

pub fn refresh_cookie(token: &str, policy: CookiePolicy) -> String {
    build_cookie(REFRESH_COOKIE_NAME, token, REFRESH_TOKEN_MAX_AGE, true, policy)
}

pub fn user_cookie(user: &UserSummary, policy: CookiePolicy) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(user)?;
    let encoded = utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string();
    Ok(build_cookie(
        USER_COOKIE_NAME,
        &encoded,
        REFRESH_TOKEN_MAX_AGE,
        false,
        policy,
    ))
}

pub fn decode_user_cookie(value: &str) -> Option<UserSummary> {
    let decoded = percent_decode_str(value).decode_utf8().ok()?;
    serde_json::from_str(&decoded).ok()
}

pub fn build_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    http_only: bool,
    policy: CookiePolicy,
) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; SameSite={}",
        name,
        value,
        COOKIE_PATH,
        max_age.as_secs(),
        policy.same_site.as_str()
    );
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if policy.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn build_clear_cookie(name: &str, policy: CookiePolicy) -> String {
    build_cookie(name, "", Duration::ZERO, name == REFRESH_COOKIE_NAME, policy)
}

/// Iterates the `name=value` pairs of a `Cookie` request header.
pub fn cookie_pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim()))
}

/// First non-empty value for `name`; an empty value counts as absent.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    cookie_pairs(header)
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
