//! File-backed persistent store.
//!
//! Stores one JSON envelope file per key under a single directory:
//!
//! ```text
//! {directory}/{key}.json
//! ```
//!
//! Keys arrive pre-namespaced from the coordinator
//! (`<namespace>_<restaurant>_<kind>_<entity?>`), so the scope of a key is
//! recoverable from its second `_`-separated segment. A running size counter
//! keeps `estimate_usage` cheap; it is seeded by a directory scan at open and
//! maintained on every write and remove.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use super::types::{StorageUsage, StoreError, StoredEntry, StoredEntryMeta};
use super::PersistentStore;

/// Durable store writing one file per entry.
pub struct FileStore {
    directory: PathBuf,
    /// Configured capacity; `None` disables quota enforcement and reports
    /// the unknown sentinel from `estimate_usage`.
    quota_bytes: Option<u64>,
    /// Running total of stored file sizes.
    used_bytes: AtomicU64,
}

impl FileStore {
    /// Open a store rooted at `directory`, creating it if needed and
    /// scanning existing entries to seed the size counter.
    pub async fn open(
        directory: impl Into<PathBuf>,
        quota_bytes: Option<u64>,
    ) -> Result<Self, StoreError> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;

        let store = Self {
            directory,
            quota_bytes,
            used_bytes: AtomicU64::new(0),
        };

        let initial = store.scan_total_size().await;
        store.used_bytes.store(initial, Ordering::Relaxed);
        debug!(
            dir = %store.directory.display(),
            used_bytes = initial,
            "File store opened"
        );

        Ok(store)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json", sanitize_filename(key)))
    }

    async fn scan_total_size(&self) -> u64 {
        let mut total = 0;
        if let Ok(mut dir) = tokio::fs::read_dir(&self.directory).await {
            while let Ok(Some(entry)) = dir.next_entry().await {
                if let Ok(meta) = entry.metadata().await {
                    if meta.is_file() {
                        total += meta.len();
                    }
                }
            }
        }
        total
    }

    /// Size of the file currently stored at `path`, or 0 if absent.
    async fn existing_size(path: &Path) -> u64 {
        tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
    }

    /// Delete a file that failed to parse, adjusting the size counter.
    async fn repair(&self, path: &Path, size: u64) {
        warn!(path = %path.display(), "Removing corrupt cache entry");
        if tokio::fs::remove_file(path).await.is_ok() {
            self.used_bytes.fetch_sub(size.min(self.used()), Ordering::Relaxed);
        }
    }

    fn used(&self) -> u64 {
        self.used_bytes.load(Ordering::Relaxed)
    }
}

impl PersistentStore for FileStore {
    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<StoredEntry>> {
        async move {
            let path = self.path_for(key);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(_) => return None,
            };

            match serde_json::from_slice::<StoredEntry>(&bytes) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(key, error = %err, "Cache entry failed to parse");
                    self.repair(&path, bytes.len() as u64).await;
                    None
                }
            }
        }
        .boxed()
    }

    fn write<'a>(
        &'a self,
        key: &'a str,
        entry: StoredEntry,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let path = self.path_for(key);
            let bytes = serde_json::to_vec(&entry)?;
            let new_size = bytes.len() as u64;
            let old_size = Self::existing_size(&path).await;

            if let Some(quota) = self.quota_bytes {
                let projected = self.used() - old_size.min(self.used()) + new_size;
                if projected > quota {
                    return Err(StoreError::QuotaExceeded {
                        used_bytes: self.used(),
                        quota_bytes: quota,
                    });
                }
            }

            tokio::fs::write(&path, &bytes).await?;
            self.used_bytes
                .fetch_add(new_size, Ordering::Relaxed);
            self.used_bytes
                .fetch_sub(old_size.min(self.used()), Ordering::Relaxed);
            Ok(())
        }
        .boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        async move {
            let path = self.path_for(key);
            let size = Self::existing_size(&path).await;
            if tokio::fs::remove_file(&path).await.is_ok() {
                self.used_bytes.fetch_sub(size.min(self.used()), Ordering::Relaxed);
            }
        }
        .boxed()
    }

    fn remove_scope<'a>(&'a self, restaurant_id: &'a str) -> BoxFuture<'a, ()> {
        async move {
            let keys: Vec<String> = self
                .scan()
                .await
                .into_iter()
                .filter(|meta| key_scope(&meta.key) == Some(restaurant_id))
                .map(|meta| meta.key)
                .collect();

            for key in keys {
                self.remove(&key).await;
            }
        }
        .boxed()
    }

    fn scan(&self) -> BoxFuture<'_, Vec<StoredEntryMeta>> {
        async move {
            let mut entries = Vec::new();
            let mut dir = match tokio::fs::read_dir(&self.directory).await {
                Ok(dir) => dir,
                Err(_) => return entries,
            };

            while let Ok(Some(file)) = dir.next_entry().await {
                let path = file.path();
                let Some(key) = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_suffix(".json"))
                    .map(String::from)
                else {
                    continue;
                };

                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(_) => continue,
                };

                match serde_json::from_slice::<StoredEntry>(&bytes) {
                    Ok(entry) => entries.push(StoredEntryMeta {
                        key,
                        stored_at_ms: entry.stored_at_ms,
                        size_bytes: bytes.len() as u64,
                    }),
                    Err(_) => {
                        // Scans repair as they go, same as reads.
                        self.repair(&path, bytes.len() as u64).await;
                    }
                }
            }

            entries
        }
        .boxed()
    }

    fn estimate_usage(&self) -> BoxFuture<'_, StorageUsage> {
        async move {
            StorageUsage {
                used_bytes: self.used(),
                quota_bytes: self.quota_bytes,
            }
        }
        .boxed()
    }
}

/// Replace path-hostile characters so any key maps to a safe filename.
fn sanitize_filename(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Restaurant scope of a namespaced key (`<ns>_<restaurant>_<kind>_...`).
fn key_scope(key: &str) -> Option<&str> {
    key.split('_').nth(1)
}
