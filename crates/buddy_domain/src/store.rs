use std::collections::HashMap;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store key `{0}`")]
    InvalidKey(String),

    #[error("i/o failure on `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to encode `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored `{key}` is corrupt, refusing to overwrite it: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Synchronous string key-value persistence. Values are JSON documents and the
/// last write to a key wins.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> StoreResult<Option<String>>;
    fn write(&self, key: &str, value: String) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: String) -> StoreResult<()> {
        validate_key(key)?;
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.entries.write().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            key: root.display().to_string(),
            source,
        })?;
        debug!(path = %root.display(), "opened json store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for JsonDirStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, value: String) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)
            .and_then(|_| fs::rename(&staging, &path))
            .map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// A typed handle on one store key.
pub struct Collection<T> {
    key: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> Collection<T> {
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    /// Reads the stored value. A missing key yields `default`; an unreadable
    /// or corrupt value is logged and also yields `default`.
    pub fn load(&self, store: &dyn KeyValueStore, default: T) -> T {
        let raw = match store.read(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(err) => {
                warn!(key = self.key, %err, "unable to read stored value");
                return default;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = self.key, %err, "discarding unparseable stored value");
                default
            }
        }
    }

    pub fn load_or_default(&self, store: &dyn KeyValueStore) -> T
    where
        T: Default,
    {
        self.load(store, T::default())
    }

    /// Strict read for read-modify-write cycles. A missing key still yields
    /// the default, but read failures and corrupt values are errors so the
    /// stored data is never replaced by a default.
    pub fn load_for_update(&self, store: &dyn KeyValueStore) -> StoreResult<T>
    where
        T: Default,
    {
        match store.read(self.key)? {
            None => Ok(T::default()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                key: self.key.to_string(),
                source,
            }),
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: self.key.to_string(),
            source,
        })?;
        store.write(self.key, raw)
    }
}

fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
