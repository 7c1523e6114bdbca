//! File-backed store: a JSON object of string slots on disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::{SessionStore, StoreError};

/// A [`SessionStore`] persisted as a JSON file.
///
/// The whole map is loaded on [`open`](Self::open) and every write
/// rewrites the file through a temporary sibling and a rename, so a crash
/// mid-write leaves either the old or the new contents on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty store.
    ///
    /// # Errors
    /// - [`StoreError::Io`] if the directory or file cannot be accessed
    /// - [`StoreError::Corrupt`] if the file is not a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => HashMap::new(),
            Ok(text) => serde_json::from_str::<HashMap<String, String>>(&text)
                .map_err(|e| StoreError::Corrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(source) => {
                return Err(StoreError::Io { path, source });
            }
        };

        tracing::debug!(path = %path.display(), slots = entries.len(), "opened session store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Opens the store at [`default_store_path`].
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(default_store_path()?)
    }

    /// Returns the file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the map, persists it, then keeps it.
    fn write_with(
        &self,
        change: impl FnOnce(&mut HashMap<String, String>),
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        change(&mut next);
        if next == *entries {
            return Ok(());
        }
        flush(&self.path, &next)?;
        *entries = next;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write_with(|map| {
            map.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.write_with(|map| {
            map.remove(key);
        })
    }
}

fn flush(path: &Path, entries: &HashMap<String, String>) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let body = serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, body).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

/// Returns `<data dir>/keygate/session.json`.
///
/// Falls back to `~/.local/share` when the platform reports no data dir.
pub fn default_store_path() -> Result<PathBuf, StoreError> {
    let mut dir = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut home| {
                home.push(".local");
                home.push("share");
                home
            })
        })
        .ok_or(StoreError::NoDataDir)?;
    dir.push("keygate");
    dir.push("session.json");
    Ok(dir)
}
