use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter};
use thiserror::Error;

use crate::config::StorageOptions;

const FILE_EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "json.tmp";

/// Logical keys of the persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter)]
pub enum StoreKey {
    #[strum(serialize = "NOTES")]
    Notes,
    #[strum(serialize = "TAGS")]
    Tags,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serializing value for key {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable storage of named values.
///
/// Implementors only move bytes; the typed `load`/`save` pair encodes values
/// as JSON. `load` never fails: a missing or unreadable payload yields the
/// caller's default.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn pretty(&self) -> bool {
        false
    }

    fn load<T>(&self, key: &str, default: T) -> T
    where
        Self: Sized,
        T: DeserializeOwned,
    {
        let raw = match self.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(err) => {
                tracing::warn!(%err, key, "stored value unavailable, using default");
                return default;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%err, key, "stored value is malformed, using default");
                default
            }
        }
    }

    fn save<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        Self: Sized,
        T: Serialize + ?Sized,
    {
        let encoded = if self.pretty() {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
        .map_err(|source| StoreError::Serialize {
            key: key.to_owned(),
            source,
        })?;
        self.write(key, &encoded)
    }
}

/// One JSON file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: Arc<PathBuf>,
    pretty: bool,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            pretty: true,
        }
    }

    pub fn with_options(options: &StorageOptions) -> Self {
        Self {
            root: Arc::new(options.data_dir.clone()),
            pretty: options.pretty_json,
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{FILE_EXTENSION}", key.to_lowercase()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                action: "reading",
                path,
                source,
            }),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&*self.root).map_err(|source| StoreError::Io {
            action: "creating data directory",
            path: self.root.to_path_buf(),
            source,
        })?;
        let final_path = self.path_for(key);
        let tmp_path = final_path.with_extension(TMP_EXTENSION);
        fs::write(&tmp_path, bytes).map_err(|source| StoreError::Io {
            action: "writing",
            path: tmp_path.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&tmp_path, &final_path) {
            remove_tmp_file(&tmp_path);
            return Err(StoreError::Io {
                action: "replacing",
                path: final_path,
                source,
            });
        }
        tracing::trace!(key, path = %final_path.display(), bytes = bytes.len(), "value saved");
        Ok(())
    }

    fn pretty(&self) -> bool {
        self.pretty
    }
}

fn remove_tmp_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(%err, path = %path.display(), "failed to remove temporary file"),
    }
}

/// Process-local store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn insert_raw(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.values.lock().insert(key.to_owned(), bytes.into());
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }
}

/// Either backend, chosen at startup.
#[derive(Debug, Clone)]
pub enum AnyStore {
    File(JsonFileStore),
    Memory(MemoryStore),
}

impl KeyValueStore for AnyStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self {
            AnyStore::File(store) => store.read(key),
            AnyStore::Memory(store) => store.read(key),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        match self {
            AnyStore::File(store) => store.write(key, bytes),
            AnyStore::Memory(store) => store.write(key, bytes),
        }
    }

    fn pretty(&self) -> bool {
        match self {
            AnyStore::File(store) => store.pretty(),
            AnyStore::Memory(store) => store.pretty(),
        }
    }
}
