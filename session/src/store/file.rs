use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use super::{rotate_record, TokenStore};
use crate::{
    error::StoreError,
    types::{Session, TokenPair, UserSummary},
};

/// Session persisted as a JSON document so it survives restarts.
///
/// Every read goes back to disk, so another process sharing the file sees the
/// latest committed write. Writes replace the whole document via a temp file
/// and rename.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Session {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Session::default(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring unreadable session file");
                Session::default()
            }
        }
    }

    fn commit(&self, session: &Session) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_vec_pretty(session)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut Session) -> T) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut session = self.load();
        let result = f(&mut session);
        self.commit(&session)?;
        Ok(result)
    }
}

impl TokenStore for FileTokenStore {
    fn get_access_token(&self) -> Option<String> {
        self.load().access_token
    }

    fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.update(|s| s.access_token = Some(token.to_string()))
    }

    fn get_refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    fn set_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        self.update(|s| s.refresh_token = Some(token.to_string()))
    }

    fn get_user(&self) -> Option<UserSummary> {
        self.load().user
    }

    fn set_user(&self, user: &UserSummary) -> Result<(), StoreError> {
        self.update(|s| s.user = Some(user.clone()))
    }

    fn clear_user(&self) -> Result<(), StoreError> {
        self.update(|s| s.user = None)
    }

    fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        self.update(|s| {
            s.access_token = Some(access.to_string());
            s.refresh_token = Some(refresh.to_string());
        })
    }

    fn rotate_tokens(&self, expected_refresh: &str, pair: &TokenPair) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut session = self.load();
        if !rotate_record(&mut session, expected_refresh, pair) {
            return Ok(false);
        }
        self.commit(&session)?;
        Ok(true)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn snapshot(&self) -> Session {
        self.load()
    }
}
