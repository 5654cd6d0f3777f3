//! Index Store
//!
//! The index maps every cache key to the bucket holding its payload and the
//! unix timestamp at which it expires. It is persisted as one JSON document:
//!
//! ```text
//! {"greeting":{"Key":"greeting","Bucket":"9f86d0...","Expiration":1700000100}}
//! ```
//!
//! The document is always rewritten in full. A save writes to a sibling temp
//! file first and renames it over the old document, so readers see either the
//! previous index or the new one, never a partial write.

use crate::config::ensure_dir;
use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// The in-memory index: key -> entry.
///
/// A `BTreeMap` keeps the serialized document ordered by key.
pub type Index = BTreeMap<String, IndexEntry>;

/// Location and lifetime of one cached value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The cache key
    #[serde(rename = "Key")]
    pub key: String,
    /// Name of the bucket file holding the payload
    #[serde(rename = "Bucket")]
    pub bucket: String,
    /// Unix timestamp (seconds) at which the entry expires
    #[serde(rename = "Expiration")]
    pub expiration: i64,
}

impl IndexEntry {
    pub fn new(key: impl Into<String>, bucket: impl Into<String>, expiration: i64) -> Self {
        Self {
            key: key.into(),
            bucket: bucket.into(),
            expiration,
        }
    }

    /// An entry is expired once `now` reaches its expiration.
    #[inline]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiration <= now
    }

    /// Seconds left before expiry, or 0 if already expired.
    pub fn remaining_ttl(&self, now: i64) -> u64 {
        if self.is_expired_at(now) {
            0
        } else {
            (self.expiration - now) as u64
        }
    }
}

/// Current unix time in whole seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Reads and writes the index document.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole index.
    ///
    /// Returns [`CacheError::IndexMissing`] if no document has been written yet.
    /// A document containing `null` loads as an empty index.
    pub fn load(&self) -> CacheResult<Index> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(CacheError::IndexMissing),
            Err(e) => return Err(CacheError::io(&self.path, e)),
        };

        let index: Option<Index> =
            serde_json::from_slice(&raw).map_err(|e| CacheError::decode("index document", e))?;
        let index = index.unwrap_or_default();

        debug!(path = %self.path.display(), entries = index.len(), "Loaded index");
        Ok(index)
    }

    /// Loads the index, treating a missing document as an empty index.
    pub fn load_or_default(&self) -> CacheResult<Index> {
        match self.load() {
            Ok(index) => Ok(index),
            Err(CacheError::IndexMissing) => Ok(Index::new()),
            Err(e) => Err(e),
        }
    }

    /// Serializes the full index and replaces the persisted document.
    pub fn save(&self, index: &Index) -> CacheResult<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }

        let encoded =
            serde_json::to_vec(index).map_err(|e| CacheError::encode("index document", e))?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &encoded).map_err(|e| CacheError::io(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| CacheError::io(&self.path, e))?;

        debug!(path = %self.path.display(), entries = index.len(), "Saved index");
        Ok(())
    }
}
