//! # Local Storage
//!
//! Durable client-side key-value storage.
//!
//! ## Keys
//! - `searchCount`: number of searches submitted on this device
//! - `theme`: `light`, `dark` or `system`
//!
//! ## Format
//! Every key lives in one protobuf-encoded file, rewritten in full on each
//! write. The file is small (a handful of keys), so there is no partial update.
use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use prost::Message;
use thiserror::Error;
use tracing::{debug, warn};

pub const SEARCH_COUNT_KEY: &str = "searchCount";
pub const THEME_KEY: &str = "theme";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Io(#[from] io::Error),

    #[error("Storage file unreadable: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Stored value for {key} is corrupt: {value}")]
    Corrupt { key: String, value: String },
}

#[derive(Clone, PartialEq, Message)]
pub struct Entries {
    #[prost(map = "string, string", tag = "1")]
    pub values: HashMap<String, String>,
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes through to durable storage before returning.
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Entries,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read(&path) {
            Ok(data) => Entries::decode(&*data)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No storage at {}, starting empty", path.display());
                Entries::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, entries })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let mut next = self.entries.clone();
        next.values.insert(key.to_string(), value);

        fs::write(&self.path, next.encode_to_vec())?;
        self.entries = next;

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Count of submitted searches, flushed to its store on every increment.
#[derive(Debug)]
pub struct SearchTracker<S: KeyValueStore> {
    store: S,
    count: u64,
}

impl<S: KeyValueStore> SearchTracker<S> {
    pub fn open(store: S) -> Result<Self, StoreError> {
        let count = match store.get(SEARCH_COUNT_KEY)? {
            Some(value) => value.parse().map_err(|_| StoreError::Corrupt {
                key: SEARCH_COUNT_KEY.to_string(),
                value,
            })?,
            None => 0,
        };

        Ok(Self { store, count })
    }

    pub fn get(&self) -> u64 {
        self.count
    }

    /// The in-memory count only moves once the new value is persisted.
    pub fn increment(&mut self) -> Result<u64, StoreError> {
        let next = self.count + 1;

        if let Err(e) = self.store.set(SEARCH_COUNT_KEY, next.to_string()) {
            warn!(error = %e, "Failed to persist search count");
            return Err(e);
        }
        self.count = next;

        Ok(next)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
            Theme::System => f.write_str("system"),
        }
    }
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            _ => Err(()),
        }
    }
}

/// Unknown stored values fall back to [`Theme::System`].
pub fn load_theme(store: &impl KeyValueStore) -> Result<Theme, StoreError> {
    Ok(store
        .get(THEME_KEY)?
        .and_then(|value| value.parse().ok())
        .unwrap_or_default())
}

pub fn save_theme(store: &mut impl KeyValueStore, theme: Theme) -> Result<(), StoreError> {
    store.set(THEME_KEY, theme.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.bin");

        let mut tracker = SearchTracker::open(FileStore::open(&path).unwrap()).unwrap();
        assert_eq!(tracker.get(), 0);
        assert_eq!(tracker.increment().unwrap(), 1);
        assert_eq!(tracker.increment().unwrap(), 2);

        let tracker = SearchTracker::open(FileStore::open(&path).unwrap()).unwrap();
        assert_eq!(tracker.get(), 2);
    }

    #[test]
    fn test_failed_flush_keeps_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("storage.bin");

        let mut tracker = SearchTracker::open(FileStore::open(&path).unwrap()).unwrap();

        assert!(matches!(tracker.increment(), Err(StoreError::Io(_))));
        assert_eq!(tracker.get(), 0);
        assert_eq!(tracker.store().get(SEARCH_COUNT_KEY).unwrap(), None);
    }

    #[test]
    fn test_corrupt_count() {
        let mut store = MemoryStore::default();
        store.set(SEARCH_COUNT_KEY, "many".to_string()).unwrap();

        assert!(matches!(
            SearchTracker::open(store),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_unreadable_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), [0xff, 0xff, 0xff]).unwrap();

        assert!(matches!(FileStore::open(file.path()), Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_theme_shares_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.bin");

        let mut tracker = SearchTracker::open(FileStore::open(&path).unwrap()).unwrap();
        tracker.increment().unwrap();
        assert_eq!(load_theme(tracker.store()).unwrap(), Theme::System);
        save_theme(tracker.store_mut(), Theme::Dark).unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(load_theme(&store).unwrap(), Theme::Dark);
        assert_eq!(SearchTracker::open(store).unwrap().get(), 1);
    }
}
