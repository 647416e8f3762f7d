//! Session and settings store.
//!
//! # Design
//! The client persists exactly two values: the bearer session token and the
//! sidebar-collapse preference. Both live behind a small key/value
//! [`Storage`] trait so the client never touches a concrete backend:
//!
//! - [`MemoryStorage`] keeps values for the lifetime of the process.
//! - [`FileStorage`] keeps a JSON object on disk, shared by every instance
//!   pointing at the same file.
//! - [`Detached`] has no persistence context at all: reads return nothing and
//!   writes are dropped, so authenticated requests go out without a token.
//!
//! Lifecycle: a successful login writes the token, logout removes it, and
//! every authenticated request reads it once.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info};

use crate::error::ApiError;

pub const SESSION_TOKEN_KEY: &str = "sessionToken";
pub const SIDEBAR_COLLAPSED_KEY: &str = "sidebarCollapsed";

/// String key/value store with interior mutability.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;
    fn remove(&self, key: &str) -> Result<(), ApiError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        (**self).remove(key)
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        (**self).remove(key)
    }
}

fn poisoned() -> ApiError {
    ApiError::Storage("storage lock poisoned".to_string())
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File-backed
// ---------------------------------------------------------------------------

/// JSON object persisted at `path`. A missing file reads as empty. Writes
/// go to `<file name>.tmp` beside the original, which is then renamed over
/// it.
///
/// The read-modify-write lock is per instance. Two `FileStorage` values on
/// the same path do not coordinate, so concurrent writes through both can
/// lose an update.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn load(&self) -> Result<HashMap<String, String>, ApiError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(ApiError::Storage(format!("{}: {e}", self.path.display()))),
        };
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw)
            .map_err(|e| ApiError::Storage(format!("{}: {e}", self.path.display())))
    }

    fn store(&self, values: &HashMap<String, String>) -> Result<(), ApiError> {
        let raw = serde_json::to_string_pretty(values)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ApiError::Storage(format!("{}: {e}", parent.display())))?;
            }
        }
        let tmp = self.temp_path();
        fs::write(&tmp, raw).map_err(|e| ApiError::Storage(format!("{}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| ApiError::Storage(format!("{}: {e}", self.path.display())))
    }

    fn update(&self, apply: impl FnOnce(&mut HashMap<String, String>)) -> Result<(), ApiError> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        let mut values = self.load()?;
        apply(&mut values);
        self.store(&values)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

// ---------------------------------------------------------------------------
// Detached
// ---------------------------------------------------------------------------

/// No persistence context. Nothing is ever stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl Storage for Detached {
    fn get(&self, _key: &str) -> Result<Option<String>, ApiError> {
        Ok(None)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), ApiError> {
        debug!(key, "detached storage ignores write");
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Typed view over a [`Storage`] holding the session token and UI settings.
#[derive(Debug, Default)]
pub struct Session<S> {
    storage: S,
}

impl<S: Storage> Session<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Stored bearer token. An empty string counts as no token.
    pub fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(self
            .storage
            .get(SESSION_TOKEN_KEY)?
            .filter(|token| !token.is_empty()))
    }

    pub fn set_token(&self, token: &str) -> Result<(), ApiError> {
        self.storage.set(SESSION_TOKEN_KEY, token)?;
        info!("session token stored");
        Ok(())
    }

    pub fn clear_token(&self) -> Result<(), ApiError> {
        self.storage.remove(SESSION_TOKEN_KEY)?;
        info!("session token cleared");
        Ok(())
    }

    pub fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.token()?.is_some())
    }

    /// Sidebar collapse preference; `false` unless `"true"` was stored.
    pub fn sidebar_collapsed(&self) -> Result<bool, ApiError> {
        Ok(self.storage.get(SIDEBAR_COLLAPSED_KEY)?.as_deref() == Some("true"))
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) -> Result<(), ApiError> {
        let value = if collapsed { "true" } else { "false" };
        self.storage.set(SIDEBAR_COLLAPSED_KEY, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_session_lifecycle() {
        let session = Session::new(MemoryStorage::new());
        assert_eq!(session.token().unwrap(), None);

        session.set_token("abc").unwrap();
        assert_eq!(session.token().unwrap().as_deref(), Some("abc"));
        assert!(session.is_authenticated().unwrap());

        session.clear_token().unwrap();
        assert_eq!(session.token().unwrap(), None);
        assert!(!session.is_authenticated().unwrap());
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let session = Session::new(MemoryStorage::new());
        session.set_token("").unwrap();
        assert_eq!(session.token().unwrap(), None);
    }

    #[test]
    fn sidebar_preference_defaults_to_expanded() {
        let session = Session::new(MemoryStorage::new());
        assert!(!session.sidebar_collapsed().unwrap());
        session.set_sidebar_collapsed(true).unwrap();
        assert!(session.sidebar_collapsed().unwrap());
        assert_eq!(
            session.storage().get(SIDEBAR_COLLAPSED_KEY).unwrap().as_deref(),
            Some("true")
        );
        session.set_sidebar_collapsed(false).unwrap();
        assert!(!session.sidebar_collapsed().unwrap());
    }

    #[test]
    fn detached_never_yields_a_token() {
        let session = Session::new(Detached);
        session.set_token("abc").unwrap();
        assert_eq!(session.token().unwrap(), None);
        session.set_sidebar_collapsed(true).unwrap();
        assert!(!session.sidebar_collapsed().unwrap());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let first = Session::new(FileStorage::new(&path));
        first.set_token("persisted").unwrap();
        first.set_sidebar_collapsed(true).unwrap();

        let second = Session::new(FileStorage::new(&path));
        assert_eq!(second.token().unwrap().as_deref(), Some("persisted"));
        assert!(second.sidebar_collapsed().unwrap());

        second.clear_token().unwrap();
        assert_eq!(first.token().unwrap(), None);
        assert!(first.sidebar_collapsed().unwrap());
    }

    #[test]
    fn file_storage_temp_file_keeps_full_name() {
        let dir = tempfile::tempdir().unwrap();
        let json = FileStorage::new(dir.path().join("a.json"));
        let cfg = FileStorage::new(dir.path().join("a.cfg"));
        assert_eq!(json.temp_path(), dir.path().join("a.json.tmp"));
        assert_ne!(json.temp_path(), cfg.temp_path());

        json.set(SESSION_TOKEN_KEY, "json").unwrap();
        cfg.set(SESSION_TOKEN_KEY, "cfg").unwrap();
        assert_eq!(json.get(SESSION_TOKEN_KEY).unwrap().as_deref(), Some("json"));
        assert_eq!(cfg.get(SESSION_TOKEN_KEY).unwrap().as_deref(), Some("cfg"));
        assert!(!dir.path().join("a.json.tmp").exists());
    }

    #[test]
    fn file_storage_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.get(SESSION_TOKEN_KEY).unwrap(), None);
        storage.remove(SESSION_TOKEN_KEY).unwrap();
    }

    #[test]
    fn file_storage_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        let err = FileStorage::new(&path).get(SESSION_TOKEN_KEY).unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));
    }

    #[test]
    fn shared_storage_through_arc() {
        let storage = Arc::new(MemoryStorage::new());
        let session = Session::new(Arc::clone(&storage));
        session.set_token("shared").unwrap();
        assert_eq!(storage.get(SESSION_TOKEN_KEY).unwrap().as_deref(), Some("shared"));
    }
}
