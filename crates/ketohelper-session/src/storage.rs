//! Durable key/value storage for the persisted session.
//!
//! The store writes one small JSON record per key, the same way a browser
//! app would use `localStorage`. [`MemoryStorage`] is for tests and
//! processes that shouldn't remember anything; [`FileStorage`] keeps one
//! file per key in a directory.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::SessionError;

/// A string-keyed, string-valued store.
///
/// Object-safe on purpose: the session store holds an
/// `Arc<dyn Storage>` so the backend can be chosen at runtime.
pub trait Storage: Send + Sync + 'static {
    /// Reads `key`, or `None` if it was never written.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the backend can't be read.
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the backend can't be written.
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Deletes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the backend can't be written.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-process storage. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.entries().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// Storage backed by a directory: key `auth-storage` lives in
/// `<dir>/auth-storage.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves either the old record or the new one, never half
/// of each.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Uses `dir`, creating it if needed.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the directory can't be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SessionError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "file storage opened");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are ours, but keep them from escaping the directory anyway.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
