use std::sync::RwLock;

use super::{rotate_record, TokenStore};
use crate::{
    error::StoreError,
    types::{Session, TokenPair, UserSummary},
};

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    record: RwLock<Session>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            record: RwLock::new(session),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> Option<T>) -> Option<T> {
        self.record.read().ok().and_then(|record| f(&record))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Session) -> T) -> Result<T, StoreError> {
        let mut record = self.record.write().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut record))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_access_token(&self) -> Option<String> {
        self.read(|r| r.access_token.clone())
    }

    fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.write(|r| r.access_token = Some(token.to_string()))
    }

    fn get_refresh_token(&self) -> Option<String> {
        self.read(|r| r.refresh_token.clone())
    }

    fn set_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        self.write(|r| r.refresh_token = Some(token.to_string()))
    }

    fn get_user(&self) -> Option<UserSummary> {
        self.read(|r| r.user.clone())
    }

    fn set_user(&self, user: &UserSummary) -> Result<(), StoreError> {
        self.write(|r| r.user = Some(user.clone()))
    }

    fn clear_user(&self) -> Result<(), StoreError> {
        self.write(|r| r.user = None)
    }

    fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        self.write(|r| {
            r.access_token = Some(access.to_string());
            r.refresh_token = Some(refresh.to_string());
        })
    }

    fn rotate_tokens(&self, expected_refresh: &str, pair: &TokenPair) -> Result<bool, StoreError> {
        self.write(|r| rotate_record(r, expected_refresh, pair))
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        self.write(|r| *r = Session::default())
    }
}
