//! Cache Engine
//!
//! This module implements the core of Honoka: a file-backed key-value cache with
//! TTL expiry. It ties the [`IndexStore`] and the [`BucketStore`] together.
//!
//! ## Design Decisions
//!
//! 1. **Whole-index writes**: every mutation rewrites the full index document.
//! 2. **Immutable buckets**: a payload file is never edited. Re-caching a key
//!    writes a new bucket; the old one is removed or left as an orphan.
//! 3. **Lazy expiry**: entries are checked when accessed. There is no
//!    background sweep; [`CacheEngine::clean`] reclaims orphaned buckets.
//! 4. **First writer wins**: `set` on a key that is still fresh is a no-op.
//!
//! ## Key Lifecycle
//!
//! ```text
//!            set / update             ttl lapses
//!  absent ─────────────────> fresh ──────────────> expired
//!    ▲                         │                      │
//!    │         delete          │       expire         │
//!    └─────────────────────────┴──────────────────────┘
//! ```
//!
//! ## Write Ordering
//!
//! `set` and `update` write the bucket before persisting the index. A crash in
//! between leaves an orphaned bucket (recoverable by `clean`) rather than an
//! index entry pointing at nothing.
//!
//! ## Concurrency
//!
//! A `CacheEngine` owns its in-memory index and takes `&mut self` for every
//! operation that may touch it. Wrap it in a `Mutex` to share it across threads.
//! Separate processes are not coordinated: the last full-index write wins.

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::storage::bucket::{bucket_name, BucketStore};
use crate::storage::index::{unix_now, Index, IndexEntry, IndexStore};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error as StdError;
use tracing::{debug, trace, warn};

/// The file-backed cache.
///
/// # Example
///
/// ```
/// use honoka::{CacheConfig, CacheEngine};
///
/// let dir = tempfile::tempdir().unwrap();
/// let mut cache = CacheEngine::open(CacheConfig::with_root(dir.path())).unwrap();
///
/// cache.set("greeting", "hello", 60).unwrap();
/// let value: String = cache.get_decoded("greeting").unwrap();
/// assert_eq!(value, "hello");
///
/// // A second set within the TTL keeps the first value
/// cache.set("greeting", "bonjour", 60).unwrap();
/// let value: String = cache.get_decoded("greeting").unwrap();
/// assert_eq!(value, "hello");
/// ```
#[derive(Debug)]
pub struct CacheEngine {
    /// Where the cache lives
    pub(crate) config: CacheConfig,

    /// Persisted key -> entry document
    pub(crate) index_store: IndexStore,

    /// Payload files
    pub(crate) buckets: BucketStore,

    /// In-memory snapshot of the index
    pub(crate) index: Index,
}

impl CacheEngine {
    /// Opens the cache rooted at `config`.
    ///
    /// A missing index document is an empty cache. A corrupt one is an error.
    pub fn open(config: CacheConfig) -> CacheResult<Self> {
        let index_store = IndexStore::new(config.index_path());
        let buckets = BucketStore::new(config.buckets_dir());
        let index = index_store.load_or_default()?;

        debug!(root = %config.root().display(), entries = index.len(), "Cache opened");

        Ok(Self {
            config,
            index_store,
            buckets,
            index,
        })
    }

    /// Opens the cache in `~/.honoka`.
    pub fn open_default() -> CacheResult<Self> {
        Self::open(CacheConfig::from_home()?)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the in-memory entry for `key` without checking expiry.
    pub fn entry(&self, key: &str) -> Option<&IndexEntry> {
        self.index.get(key)
    }

    /// Reports whether `key` must be (re)cached.
    ///
    /// An absent key counts as expired. A present key whose expiration has been
    /// reached is deleted, bucket included, before returning `true`.
    pub fn expire(&mut self, key: &str) -> CacheResult<bool> {
        let now = unix_now();
        let expired = match self.index.get(key) {
            None => {
                trace!(key = %key, "Key absent, treating as expired");
                return Ok(true);
            }
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            trace!(key = %key, "Key expired");
            self.delete(key)?;
        }

        Ok(expired)
    }

    /// Returns the raw payload cached under `key`.
    ///
    /// # Errors
    ///
    /// - [`CacheError::CacheExpired`] if the key is absent or expired
    /// - [`CacheError::BucketNotFound`] if the payload file was removed behind
    ///   the index's back
    pub fn get(&mut self, key: &str) -> CacheResult<Bytes> {
        if self.expire(key)? {
            return Err(CacheError::CacheExpired {
                key: key.to_string(),
            });
        }

        self.read_payload(key)
    }

    /// Returns the value cached under `key`, decoded into `T`.
    ///
    /// Fails with [`CacheError::Decode`] if the payload does not fit `T`.
    pub fn get_decoded<T: DeserializeOwned>(&mut self, key: &str) -> CacheResult<T> {
        let raw = self.get(key)?;
        decode_payload(key, &raw)
    }

    /// Caches `value` under `key` for `ttl_secs` seconds.
    ///
    /// Does nothing if `key` holds a value that has not expired yet.
    ///
    /// # Returns
    ///
    /// Returns `true` if `value` was stored, `false` if an existing fresh value
    /// was kept.
    pub fn set<T>(&mut self, key: &str, value: &T, ttl_secs: u64) -> CacheResult<bool>
    where
        T: Serialize + ?Sized,
    {
        if !self.expire(key)? {
            debug!(key = %key, "Key still fresh, keeping cached value");
            return Ok(false);
        }

        self.store(key, value, ttl_secs)?;
        Ok(true)
    }

    /// Returns the cached value for `key`, refreshing it with `updater` first if
    /// it is absent or expired.
    ///
    /// `updater` is only called when a refresh is needed. If it fails, nothing is
    /// written and its error is returned as [`CacheError::Updater`].
    pub fn update<T, E, F>(&mut self, key: &str, updater: F, ttl_secs: u64) -> CacheResult<Bytes>
    where
        T: Serialize,
        E: Into<Box<dyn StdError + Send + Sync>>,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.expire(key)? {
            return self.read_payload(key);
        }

        let value = updater().map_err(|e| CacheError::Updater(e.into()))?;
        self.store(key, &value, ttl_secs)
    }

    /// Typed variant of [`update`](Self::update).
    pub fn update_decoded<T, E, F>(&mut self, key: &str, updater: F, ttl_secs: u64) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        E: Into<Box<dyn StdError + Send + Sync>>,
        F: FnOnce() -> Result<T, E>,
    {
        let raw = self.update(key, updater, ttl_secs)?;
        decode_payload(key, &raw)
    }

    /// Removes `key` and its bucket.
    ///
    /// An entry whose bucket name is not a plain file name is dropped from the
    /// index without touching the filesystem.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was present, `false` if there was nothing to do.
    pub fn delete(&mut self, key: &str) -> CacheResult<bool> {
        let bucket = match self.index.get(key) {
            Some(entry) => entry.bucket.clone(),
            None => return Ok(false),
        };

        match self.buckets.remove(&bucket) {
            Ok(_) => {}
            Err(CacheError::InvalidBucket { .. }) => {
                warn!(key = %key, bucket = %bucket, "Index entry names an invalid bucket, dropping it");
            }
            Err(e) => return Err(e),
        }

        let mut next = self.index.clone();
        next.remove(key);
        self.index_store.save(&next)?;
        self.index = next;

        debug!(key = %key, bucket = %bucket, "Deleted key");
        Ok(true)
    }

    /// Returns every index entry, reloading the index from disk first.
    pub fn list(&mut self) -> CacheResult<Vec<IndexEntry>> {
        self.reload()?;
        Ok(self.index.values().cloned().collect())
    }

    /// Replaces the in-memory index with the persisted one.
    pub fn reload(&mut self) -> CacheResult<()> {
        self.index = self.index_store.load_or_default()?;
        Ok(())
    }

    /// Reads the bucket the in-memory index records for `key`.
    fn read_payload(&self, key: &str) -> CacheResult<Bytes> {
        match self.index.get(key) {
            Some(entry) => self.buckets.read(&entry.bucket),
            None => Err(CacheError::CacheExpired {
                key: key.to_string(),
            }),
        }
    }

    /// Writes a new bucket for `key` and records it in the index.
    fn store<T>(&mut self, key: &str, value: &T, ttl_secs: u64) -> CacheResult<Bytes>
    where
        T: Serialize + ?Sized,
    {
        let expiration = expiration_after(unix_now(), ttl_secs);
        let bucket = bucket_name(key, expiration);
        let payload = self.buckets.write(&bucket, value)?;

        // Pick up entries other writers persisted since we loaded
        let mut next = self.index_store.load_or_default()?;
        next.insert(
            key.to_string(),
            IndexEntry::new(key, bucket.as_str(), expiration),
        );
        self.index_store.save(&next)?;
        self.index = next;

        debug!(key = %key, bucket = %bucket, expiration, "Cached value");
        Ok(payload)
    }
}

/// Unix timestamp `ttl_secs` seconds after `now`, saturating at `i64::MAX`.
fn expiration_after(now: i64, ttl_secs: u64) -> i64 {
    now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX))
}

fn decode_payload<T: DeserializeOwned>(key: &str, raw: &[u8]) -> CacheResult<T> {
    serde_json::from_slice(raw).map_err(|e| CacheError::decode(format!("payload of '{}'", key), e))
}
