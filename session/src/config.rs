use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};
use url::Url;

use crate::cookies::CookiePolicy;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_PUBLIC_ROUTES: &str = "/,/login,/register,/pricing,/forget-password,/reset-password";
const DEFAULT_PROTECTED_PREFIXES: &str = "/dashboard,/resume,/employer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub api_base_url: String,
    pub is_production: bool,
    pub request_timeout: Duration,
    pub sign_in_path: String,
    pub public_routes: Vec<String>,
    pub protected_prefixes: Vec<String>,
    pub session_file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            is_production: false,
            request_timeout: Duration::from_secs(120),
            sign_in_path: "/login".to_string(),
            public_routes: split_list(DEFAULT_PUBLIC_ROUTES),
            protected_prefixes: split_list(DEFAULT_PROTECTED_PREFIXES),
            session_file: PathBuf::from(".joblinker/session.json"),
        }
    }
}

impl SessionConfig {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let raw_base = lookup("JOBLINKER_API_URL").unwrap_or(defaults.api_base_url);
        Url::parse(&raw_base)
            .with_context(|| format!("Invalid JOBLINKER_API_URL value: {}", raw_base))?;
        let api_base_url = raw_base.trim_end_matches('/').to_string();

        let is_production = lookup("APP_ENV")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "production" | "prod"))
            .unwrap_or(false);

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("Invalid REQUEST_TIMEOUT_SECS value: {}", raw))?;
                if !(1..=600).contains(&secs) {
                    return Err(anyhow!(
                        "REQUEST_TIMEOUT_SECS must be between 1 and 600, got {}",
                        secs
                    ));
                }
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        let sign_in_path = lookup("SIGN_IN_PATH").unwrap_or(defaults.sign_in_path);
        if !sign_in_path.starts_with('/') {
            return Err(anyhow!("SIGN_IN_PATH must start with '/': {}", sign_in_path));
        }

        let public_routes = lookup("PUBLIC_ROUTES")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.public_routes);
        let protected_prefixes = lookup("PROTECTED_ROUTE_PREFIXES")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.protected_prefixes);

        let session_file = lookup("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.session_file);

        Ok(SessionConfig {
            api_base_url,
            is_production,
            request_timeout,
            sign_in_path,
            public_routes,
            protected_prefixes,
            session_file,
        })
    }

    pub fn cookie_policy(&self) -> CookiePolicy {
        CookiePolicy::for_environment(self.is_production)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
