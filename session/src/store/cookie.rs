use std::sync::{Mutex, RwLock};

use super::{rotate_record, TokenStore};
use crate::{
    cookies::{
        access_cookie, build_clear_cookie, cookie_value, decode_user_cookie,
        refresh_cookie, user_cookie, CookiePolicy, ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME,
        USER_COOKIE_NAME,
    },
    error::StoreError,
    types::{Session, TokenPair, UserSummary},
};

/// Store for a server-rendered request: seeded from the incoming `Cookie`
/// header, and every mutation queues the `Set-Cookie` header that carries it
/// back to the browser.
#[derive(Debug)]
pub struct CookieTokenStore {
    record: RwLock<Session>,
    pending: Mutex<Vec<String>>,
    policy: CookiePolicy,
}

impl CookieTokenStore {
    pub fn from_cookie_header(header: Option<&str>, policy: CookiePolicy) -> Self {
        let session = header
            .map(|h| Session {
                access_token: cookie_value(h, ACCESS_COOKIE_NAME),
                refresh_token: cookie_value(h, REFRESH_COOKIE_NAME),
                user: cookie_value(h, USER_COOKIE_NAME)
                    .and_then(|v| decode_user_cookie(&v)),
            })
            .unwrap_or_default();
        Self {
            record: RwLock::new(session),
            pending: Mutex::new(Vec::new()),
            policy,
        }
    }

    /// Drains the `Set-Cookie` values accumulated so far, in write order.
    pub fn take_set_cookie_headers(&self) -> Vec<String> {
        self.pending
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default()
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> Option<T>) -> Option<T> {
        self.record.read().ok().and_then(|record| f(&record))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Session) -> (T, Vec<String>),
    ) -> Result<T, StoreError> {
        let mut record = self.record.write().map_err(|_| StoreError::Poisoned)?;
        let (result, headers) = f(&mut record);
        self.pending
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .extend(headers);
        Ok(result)
    }
}

impl TokenStore for CookieTokenStore {
    fn get_access_token(&self) -> Option<String> {
        self.read(|r| r.access_token.clone())
    }

    fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        let header = access_cookie(token, self.policy);
        self.write(|r| {
            r.access_token = Some(token.to_string());
            ((), vec![header])
        })
    }

    fn get_refresh_token(&self) -> Option<String> {
        self.read(|r| r.refresh_token.clone())
    }

    fn set_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        let header = refresh_cookie(token, self.policy);
        self.write(|r| {
            r.refresh_token = Some(token.to_string());
            ((), vec![header])
        })
    }

    fn get_user(&self) -> Option<UserSummary> {
        self.read(|r| r.user.clone())
    }

    fn set_user(&self, user: &UserSummary) -> Result<(), StoreError> {
        let header = user_cookie(user, self.policy)?;
        self.write(|r| {
            r.user = Some(user.clone());
            ((), vec![header])
        })
    }

    fn clear_user(&self) -> Result<(), StoreError> {
        let header = build_clear_cookie(USER_COOKIE_NAME, self.policy);
        self.write(|r| {
            r.user = None;
            ((), vec![header])
        })
    }

    fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        let headers = vec![
            access_cookie(access, self.policy),
            refresh_cookie(refresh, self.policy),
        ];
        self.write(|r| {
            r.access_token = Some(access.to_string());
            r.refresh_token = Some(refresh.to_string());
            ((), headers)
        })
    }

    fn rotate_tokens(&self, expected_refresh: &str, pair: &TokenPair) -> Result<bool, StoreError> {
        let policy = self.policy;
        self.write(|r| {
            if rotate_record(r, expected_refresh, pair) {
                let headers = vec![
                    access_cookie(&pair.access_token, policy),
                    refresh_cookie(&pair.refresh_token, policy),
                ];
                (true, headers)
            } else {
                (false, Vec::new())
            }
        })
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let headers: Vec<String> = [ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, USER_COOKIE_NAME]
            .into_iter()
            .map(|name| build_clear_cookie(name, self.policy))
            .collect();
        self.write(|r| {
            *r = Session::default();
            ((), headers)
        })
    }
}
