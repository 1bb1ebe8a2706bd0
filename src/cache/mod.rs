//! Flat-File Disk Cache
//!
//! Key→content store backing both generated pages and image binaries.
//! One file per key: text entries are JSON-wrapped (`<key>.json`), binary
//! entries are raw bytes (`<key>.bin`) with a JSON sidecar
//! (`<key>.meta.json`) carrying string metadata. A binary entry and its
//! sidecar are written together and read together; a missing sidecar yields
//! empty metadata, not an error.
//!
//! ## Failure Semantics
//!
//! The cache is best-effort, never authoritative. All I/O errors are caught
//! and logged; reads degrade to a miss, writes degrade to a no-op. Expiry is
//! checked only on read; an expired file stays on disk until overwritten or
//! swept by the optional `clear_expired` maintenance operation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::cache::{BINARY_EXT, META_SUFFIX, TEXT_EXT};
use crate::types::Result;

/// JSON wrapper around a text cache entry
#[derive(Debug, Serialize, Deserialize)]
struct TextEntry {
    key: String,
    content: String,
    created_at: DateTime<Utc>,
}

/// Sidecar metadata record stored next to a binary entry
#[derive(Debug, Serialize, Deserialize)]
struct BinarySidecar {
    key: String,
    metadata: HashMap<String, String>,
    created_at: DateTime<Utc>,
}

/// A binary entry resolved from disk
#[derive(Debug)]
pub struct BinaryEntry {
    pub bytes: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

/// Cache statistics from a full directory scan
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub file_count: usize,
    pub text_files: usize,
    pub binary_files: usize,
    pub total_size_bytes: u64,
}

/// Disk-backed cache with age-based expiry
pub struct PageCache {
    cache_dir: PathBuf,
}

impl PageCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn text_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", key, TEXT_EXT))
    }

    fn binary_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", key, BINARY_EXT))
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", key, META_SUFFIX))
    }

    /// Check whether an entry exists and its modification time is within
    /// `max_age_hours`. An entry aged exactly at the boundary counts as
    /// expired, so `max_age_hours = 0` reports nothing as cached.
    pub async fn is_cached(&self, key: &str, max_age_hours: u64, binary: bool) -> bool {
        let path = if binary {
            self.binary_path(key)
        } else {
            self.text_path(key)
        };
        within_age(&path, max_age_hours).await
    }

    /// Fetch a text entry, or `None` on miss or corruption.
    pub async fn get_text(&self, key: &str) -> Option<String> {
        let path = self.text_path(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cache read failed for '{}': {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<TextEntry>(&raw) {
            Ok(entry) => Some(entry.content),
            Err(e) => {
                warn!("Corrupt cache entry '{}' treated as miss: {}", key, e);
                None
            }
        }
    }

    /// Fetch a binary entry with its sidecar metadata, or `None` on miss.
    /// A missing sidecar yields empty metadata rather than a miss.
    pub async fn get_binary(&self, key: &str) -> Option<BinaryEntry> {
        let bytes = match tokio::fs::read(self.binary_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cache read failed for '{}': {}", key, e);
                return None;
            }
        };

        let metadata = match tokio::fs::read_to_string(self.sidecar_path(key)).await {
            Ok(raw) => match serde_json::from_str::<BinarySidecar>(&raw) {
                Ok(sidecar) => sidecar.metadata,
                Err(e) => {
                    warn!("Corrupt sidecar for '{}', using empty metadata: {}", key, e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Some(BinaryEntry { bytes, metadata })
    }

    /// Write a text entry, unconditionally overwriting any prior entry.
    /// Errors are logged; the caller must not rely on the write landing.
    pub async fn set_text(&self, key: &str, content: &str) {
        let entry = TextEntry {
            key: key.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Cache serialize failed for '{}': {}", key, e);
                return;
            }
        };

        if let Err(e) = self.write_atomic(&self.text_path(key), serialized.as_bytes()).await {
            warn!("Cache write failed for '{}': {}", key, e);
        } else {
            debug!("Cached text entry '{}' ({} bytes)", key, serialized.len());
        }
    }

    /// Write a binary entry and its sidecar together.
    pub async fn set_binary(&self, key: &str, bytes: &[u8], metadata: HashMap<String, String>) {
        let sidecar = BinarySidecar {
            key: key.to_string(),
            metadata,
            created_at: Utc::now(),
        };

        let serialized = match serde_json::to_string(&sidecar) {
            Ok(s) => s,
            Err(e) => {
                warn!("Sidecar serialize failed for '{}': {}", key, e);
                return;
            }
        };

        if let Err(e) = self.write_atomic(&self.binary_path(key), bytes).await {
            warn!("Cache write failed for '{}': {}", key, e);
            return;
        }
        if let Err(e) = self.write_atomic(&self.sidecar_path(key), serialized.as_bytes()).await {
            warn!("Sidecar write failed for '{}': {}", key, e);
            return;
        }
        debug!("Cached binary entry '{}' ({} bytes)", key, bytes.len());
    }

    /// Atomic per-key write: temp file in the same directory, then rename.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Full directory scan. O(entries), acceptable at single-node scale.
    pub async fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();

        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };

            if let Ok(meta) = entry.metadata().await {
                stats.total_size_bytes += meta.len();
            }

            match ext {
                TEXT_EXT if !is_sidecar(&path) => {
                    stats.file_count += 1;
                    stats.text_files += 1;
                }
                BINARY_EXT => {
                    stats.file_count += 1;
                    stats.binary_files += 1;
                }
                _ => {}
            }
        }

        Ok(stats)
    }

    /// Remove entries older than `max_age_hours`. Maintenance only; the
    /// pipeline never calls this.
    pub async fn clear_expired(&self, max_age_hours: u64) -> Result<usize> {
        let mut removed = 0;

        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !within_age(&path, max_age_hours).await {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove expired '{}': {}", path.display(), e),
                }
            }
        }

        debug!("Cleared {} expired cache files", removed);
        Ok(removed)
    }
}

fn is_sidecar(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.ends_with(META_SUFFIX))
}

async fn within_age(path: &Path, max_age_hours: u64) -> bool {
    let Ok(meta) = tokio::fs::metadata(path).await else {
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    let age = SystemTime::now().duration_since(modified).unwrap_or_default();
    age < Duration::from_secs(max_age_hours * 3600)
}
