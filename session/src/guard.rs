//! Navigation gate for protected destinations.
//!
//! The guard only decides; the caller performs the redirect.

use std::{collections::HashSet, sync::Arc};

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::{config::SessionConfig, session::SessionContext, token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Protected,
    Unrestricted,
}

#[derive(Debug, Clone)]
pub struct RoutePolicy {
    public: HashSet<String>,
    protected_prefixes: Vec<String>,
}

impl RoutePolicy {
    pub fn new<P, Q>(public: P, protected_prefixes: Q) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        Self {
            public: public
                .into_iter()
                .map(|p| normalize_path(p.as_ref()))
                .collect(),
            protected_prefixes: protected_prefixes
                .into_iter()
                .map(|p| normalize_path(p.as_ref()))
                .collect(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.public_routes, &config.protected_prefixes)
    }

    pub fn classify(&self, path: &str) -> RouteAccess {
        let path = normalize_path(path);
        if self.public.contains(&path) {
            return RouteAccess::Public;
        }
        if self
            .protected_prefixes
            .iter()
            .any(|prefix| is_under(&path, prefix))
        {
            RouteAccess::Protected
        } else {
            RouteAccess::Unrestricted
        }
    }
}

/// Strips the query string and trailing slashes; empty becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn is_under(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRedirect {
    pub location: String,
    pub return_to: String,
}

impl SignInRedirect {
    fn new(sign_in_path: &str, return_to: &str) -> Self {
        Self {
            location: format!(
                "{}?redirect={}",
                sign_in_path,
                utf8_percent_encode(return_to, NON_ALPHANUMERIC)
            ),
            return_to: return_to.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Proceed,
    RedirectToSignIn(SignInRedirect),
}

impl NavigationOutcome {
    pub fn is_proceed(&self) -> bool {
        matches!(self, NavigationOutcome::Proceed)
    }
}

pub struct RouteGuard {
    policy: RoutePolicy,
    sign_in_path: String,
    session: Arc<SessionContext>,
}

impl RouteGuard {
    pub fn new(policy: RoutePolicy, sign_in_path: impl Into<String>, session: Arc<SessionContext>) -> Self {
        Self {
            policy,
            sign_in_path: sign_in_path.into(),
            session,
        }
    }

    pub fn from_config(config: &SessionConfig, session: Arc<SessionContext>) -> Self {
        Self::new(RoutePolicy::from_config(config), config.sign_in_path.clone(), session)
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub async fn check(&self, path: &str) -> NavigationOutcome {
        let path = normalize_path(path);
        if self.policy.classify(&path) != RouteAccess::Protected {
            return NavigationOutcome::Proceed;
        }

        let store = self.session.store();
        let access = store.get_access_token();
        let refresh = store.get_refresh_token();

        if access.is_none() && refresh.is_none() {
            tracing::debug!(%path, "no session; redirecting to sign-in");
            return self.redirect(&path);
        }

        if let Some(token) = access.as_deref() {
            if !token::is_expired(token) {
                return NavigationOutcome::Proceed;
            }
        }

        if refresh.is_none() {
            tracing::debug!(%path, "access token expired and no refresh token");
            self.session.end();
            return self.redirect(&path);
        }

        match self.session.renew(access.as_deref()).await {
            Ok(_) => {
                tracing::debug!(%path, "session renewed during navigation");
                NavigationOutcome::Proceed
            }
            Err(err) => {
                tracing::info!(%path, error = %err, "session renewal failed; redirecting to sign-in");
                // renew already cleared a session it failed to refresh
                self.redirect(&path)
            }
        }
    }

    fn redirect(&self, path: &str) -> NavigationOutcome {
        NavigationOutcome::RedirectToSignIn(SignInRedirect::new(&self.sign_in_path, path))
    }
}
