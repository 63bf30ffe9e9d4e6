//! Persistence for the three session fields.
//!
//! Reads never fail: a missing or unreadable value is simply absent.

mod cookie;
mod file;
mod memory;

pub use cookie::CookieTokenStore;
pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::{
    error::StoreError,
    types::{Session, TokenPair, UserSummary},
};

pub trait TokenStore: Send + Sync {
    fn get_access_token(&self) -> Option<String>;
    fn set_access_token(&self, token: &str) -> Result<(), StoreError>;

    fn get_refresh_token(&self) -> Option<String>;
    fn set_refresh_token(&self, token: &str) -> Result<(), StoreError>;

    fn get_user(&self) -> Option<UserSummary>;
    fn set_user(&self, user: &UserSummary) -> Result<(), StoreError>;
    fn clear_user(&self) -> Result<(), StoreError>;

    /// Writes both tokens in one step; readers never see half of a pair.
    fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), StoreError>;

    /// Replaces the pair only while `expected_refresh` is still the stored
    /// refresh token. Returns `false` (and writes nothing) otherwise.
    fn rotate_tokens(&self, expected_refresh: &str, pair: &TokenPair) -> Result<bool, StoreError>;

    fn clear_all(&self) -> Result<(), StoreError>;

    fn snapshot(&self) -> Session {
        Session {
            access_token: self.get_access_token(),
            refresh_token: self.get_refresh_token(),
            user: self.get_user(),
        }
    }
}

/// Applies a rotation to an in-memory record. Shared by every backing.
pub(crate) fn rotate_record(record: &mut Session, expected_refresh: &str, pair: &TokenPair) -> bool {
    if record.refresh_token.as_deref() != Some(expected_refresh) {
        return false;
    }
    record.access_token = Some(pair.access_token.clone());
    record.refresh_token = Some(pair.refresh_token.clone());
    true
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every `TokenStore` must share.

    use super::*;
    use crate::test_support::seeker;

    pub fn round_trips_tokens(store: &dyn TokenStore) {
        store.set_tokens("access-1", "refresh-1").expect("set tokens");
        assert_eq!(store.get_access_token().as_deref(), Some("access-1"));
        assert_eq!(store.get_refresh_token().as_deref(), Some("refresh-1"));

        store.set_access_token("access-2").expect("set access");
        store.set_refresh_token("refresh-2").expect("set refresh");
        assert_eq!(store.get_access_token().as_deref(), Some("access-2"));
        assert_eq!(store.get_refresh_token().as_deref(), Some("refresh-2"));
    }

    pub fn clear_all_removes_every_field(store: &dyn TokenStore) {
        store.set_tokens("a", "r").expect("set tokens");
        store.set_user(&seeker("7")).expect("set user");
        assert_eq!(store.get_user(), Some(seeker("7")));

        store.clear_all().expect("clear");
        assert!(store.get_access_token().is_none());
        assert!(store.get_refresh_token().is_none());
        assert!(store.get_user().is_none());
        assert_eq!(store.snapshot(), Session::default());
    }

    pub fn rotation_requires_current_refresh_token(store: &dyn TokenStore) {
        store.set_tokens("a1", "r1").expect("set tokens");
        let next = TokenPair {
            access_token: "a2".into(),
            refresh_token: "r2".into(),
        };

        assert!(!store.rotate_tokens("r0", &next).expect("stale rotate"));
        assert_eq!(store.get_access_token().as_deref(), Some("a1"));

        assert!(store.rotate_tokens("r1", &next).expect("rotate"));
        assert_eq!(store.get_access_token().as_deref(), Some("a2"));
        assert_eq!(store.get_refresh_token().as_deref(), Some("r2"));

        store.clear_all().expect("clear");
        assert!(!store.rotate_tokens("r2", &next).expect("rotate after clear"));
        assert!(store.get_access_token().is_none());
    }

    pub fn clear_user_keeps_tokens(store: &dyn TokenStore) {
        store.set_tokens("a", "r").expect("set tokens");
        store.set_user(&seeker("1")).expect("set user");
        store.clear_user().expect("clear user");
        assert!(store.get_user().is_none());
        assert_eq!(store.get_access_token().as_deref(), Some("a"));
    }

    pub fn run_all(make: impl Fn() -> Box<dyn TokenStore>) {
        round_trips_tokens(make().as_ref());
        clear_all_removes_every_field(make().as_ref());
        rotation_requires_current_refresh_token(make().as_ref());
        clear_user_keeps_tokens(make().as_ref());
    }
}
