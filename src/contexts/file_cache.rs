use crate::data::Cache;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

const DEFAULT_FOLDER: &str = ".surrogate";
const EXTENSION: &str = "cache";

/// FileCache is an implementation of the Cache trait that stores cached values
/// in a file structure, so they survive the process.
///
/// The cache is organized as: `{folder}/{namespace}/{sha256(key)}.cache`
/// where namespace separates values produced by different providers.
/// Entries are written once and never overwritten. A value is written to a
/// temporary file in the same directory and only then linked into place, so
/// readers (threads or other processes) see either no entry or the whole value.
#[derive(Debug, Clone)]
pub struct FileCache {
    /// The root folder path for the cache (defaults to ".surrogate")
    folder: String,
    /// Subfolder grouping the entries of one provider
    namespace: String,
}

impl FileCache {
    /// Creates a new FileCache instance
    ///
    /// # Arguments
    /// * `folder` - Optional root folder path. If None, defaults to ".surrogate"
    /// * `namespace` - Subfolder name, typically a hash identifying the provider
    pub fn new(folder: Option<String>, namespace: String) -> Self {
        Self {
            folder: folder.unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            namespace,
        }
    }

    /// Constructs the cache file path for a given key
    ///
    /// Keys are arbitrary strings, so the file name is the hex SHA-256 of the key.
    fn get_cache_path(&self, key: &str) -> PathBuf {
        let mut path = self.get_cache_dir();
        path.push(format!("{}.{}", hash_key(key), EXTENSION));
        path
    }

    /// Gets the directory path for cache files (without the filename)
    fn get_cache_dir(&self) -> PathBuf {
        let mut path = PathBuf::from(&self.folder);
        path.push(&self.namespace);
        path
    }
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

impl Cache for FileCache {
    /// Retrieves a cached value for the given key
    ///
    /// # Returns
    /// * `Some(String)` - The cached value if found and readable
    /// * `None` - If the cache file doesn't exist or cannot be read
    fn get(&self, key: &str) -> Option<String> {
        let path = self.get_cache_path(key);

        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        "[FileCache] get, unreadable entry treated as miss, path={}, error={}",
                        path.display(),
                        e
                    );
                }
                None
            }
        }
    }

    /// Stores a value in the cache for the given key
    ///
    /// Creates necessary directories if they don't exist. An existing entry is
    /// left untouched. Errors are logged without panicking.
    fn set(&self, key: &str, value: &str) {
        let path = self.get_cache_path(key);
        let dir = self.get_cache_dir();

        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::error!(
                "[FileCache] set, failed to create cache directory, dir={}, error={}",
                dir.display(),
                e
            );
            return;
        }

        let mut staged = match NamedTempFile::new_in(&dir) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(
                    "[FileCache] set, failed to create staging file, dir={}, error={}",
                    dir.display(),
                    e
                );
                return;
            }
        };

        if let Err(e) = staged.write_all(value.as_bytes()).and_then(|_| staged.flush()) {
            tracing::error!(
                "[FileCache] set, failed to write staging file, dir={}, error={}",
                dir.display(),
                e
            );
            // The staging file is removed when `staged` drops
            return;
        }

        match staged.persist_noclobber(&path) {
            Ok(_) => {}
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("[FileCache] set, key already stored, key={}", key);
            }
            Err(e) => {
                tracing::error!(
                    "[FileCache] set, failed to publish cache file, path={}, error={}",
                    path.display(),
                    e.error
                );
            }
        }
    }

    fn len(&self) -> usize {
        match fs::read_dir(self.get_cache_dir()) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| {
                    entry.path().extension().and_then(|ext| ext.to_str()) == Some(EXTENSION)
                })
                .count(),
            Err(_) => 0,
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.get_cache_path(key).is_file()
    }
}
