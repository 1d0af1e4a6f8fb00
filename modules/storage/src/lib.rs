// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Storage Modul for the ride tracker
//!
//! Provides the persistent key-value storage the domain store keeps its cached
//! collections in, and the authentication token falls back to. Values are
//! opaque strings, in practice one JSON blob per key.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    fs::DirBuilder,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info};

/// Asynchronous persistent key-value storage.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Returns the value stored for `key`, `None` if the key is absent.
    async fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Stores `value` for `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> io::Result<()>;
}

/// A file system–based implementation of a key-value storage.
///
/// Every key is stored as a separate file with the `.json` extension in the
/// root directory. Characters of the key that are not ASCII alphanumeric,
/// `-` or `_` are replaced by `_` in the file name.
///
/// ## Important
///
/// `FileSystemStorage` **does not implement any internal locking across processes**.
/// Therefore, **only one instance should be used per `root_dir` in the application at any time**.
/// Creating multiple instances pointing to the same directory may result in
/// lost updates.
pub struct FileSystemStorage {
    root_dir: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root_dir: &Path) -> Self {
        if let Err(e) = DirBuilder::new().recursive(true).create(root_dir) {
            error!(
                "Failed to create storage dir folder {}. Error: {}",
                root_dir.to_string_lossy(),
                e
            );
        }
        info!("Using storage folder: {}", root_dir.to_string_lossy());
        FileSystemStorage {
            root_dir: root_dir.to_path_buf(),
        }
    }

    /// Constructs the file path for `key`: `<root_dir>/<sanitized key>.json`.
    fn file_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let mut file_path = self.root_dir.clone();
        file_path.push(file_name);
        file_path.set_extension("json");
        file_path
    }

    /// Writes arbitrary bytes to the file at `path`, ensuring they are persisted.
    ///
    /// The data is first written and synced to a temporary sibling file that is
    /// then renamed over `path`, so readers never observe a partially written
    /// value.
    ///
    /// Errors:
    /// - Propagates I/O errors from file creation, writing, syncing and renaming.
    /// - Returns `io::ErrorKind::NotFound` if the root directory is missing.
    async fn save_bytes(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut tmp_path = path.to_path_buf();
        tmp_path.set_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    async fn load_file(&self, path: &Path) -> io::Result<String> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut content = String::default();
        file.read_to_string(&mut content).await?;
        Ok(content)
    }
}

#[async_trait]
impl KeyValueStorage for FileSystemStorage {
    async fn get(&self, key: &str) -> io::Result<Option<String>> {
        let file_path = self.file_path(key);
        match self.load_file(&file_path).await {
            Ok(content) => {
                debug!("Loaded key {} from {}", key, file_path.to_string_lossy());
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!(
                    "Failed to load key {} from {}. Error: {}",
                    key,
                    file_path.to_string_lossy(),
                    e
                );
                Err(e)
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let file_path = self.file_path(key);
        self.save_bytes(&file_path, value.as_bytes()).await?;
        debug!("Stored key {} in {}", key, file_path.to_string_lossy());
        Ok(())
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.file_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// In-memory key-value storage.
///
/// Used when nothing shall survive the process and as a storage double in tests.
/// Clones share the same content.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage that already holds the given entries.
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let values = entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        MemoryStorage {
            values: Arc::new(Mutex::new(values)),
        }
    }

    /// Returns the stored value without going through the async interface.
    pub fn value(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
