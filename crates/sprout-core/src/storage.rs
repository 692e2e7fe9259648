//! Local key-value store.
//!
//! Holds the handful of values the client keeps between runs: the device
//! identity, the backend session id and the cached transcript. Values are
//! JSON so each key can hold a string or a whole message list.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub const USER_ID_KEY: &str = "X_USER_ID";
pub const SESSION_ID_KEY: &str = "X_SESSION_ID";
pub const MESSAGES_KEY: &str = "LOCAL_MESSAGES";

pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed helpers on top of any [`Storage`].
pub trait StorageExt: Storage {
    /// Reads `key` as `T`. A value of the wrong shape counts as absent.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        Ok(self
            .get(key)?
            .and_then(|value| serde_json::from_value(value).ok()))
    }

    fn set_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        self.set(key, serde_json::to_value(value)?)
    }

    /// Reads a string value, treating `""` as absent.
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .get_as::<String>(key)?
            .filter(|value| !value.is_empty()))
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// A single JSON object file, rewritten on every change.
pub struct FileStore {
    path: PathBuf,
    entries: RefCell<Map<String, Value>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Map::new()
        };

        Ok(Self {
            path,
            entries: RefCell::new(entries),
        })
    }

    /// Opens the store in the user data directory (`<data_dir>/sprout/storage.json`).
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf, StorageError> {
        let data_dir = dirs::data_dir().ok_or_else(|| StorageError::Io {
            path: PathBuf::from("sprout"),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine data directory",
            ),
        })?;
        Ok(data_dir.join("sprout").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&*self.entries.borrow())?;
        fs::write(&self.path, content).map_err(io_err)?;
        Ok(())
    }
}

impl Storage for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.entries.borrow_mut().remove(key);
        if removed.is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Non-persistent store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
