//! Error Types
//!
//! Every fallible operation in the cache returns [`CacheResult`]. Errors from the
//! index store and the bucket store propagate unchanged through the engine, so a
//! caller sees the same variant no matter which layer noticed the problem.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No index document has been written yet.
    ///
    /// The engine treats this as an empty cache; it only reaches callers that
    /// talk to the index store directly.
    #[error("index file not found")]
    IndexMissing,

    /// The index references a payload file that is not on disk.
    #[error("bucket file not found: {bucket}")]
    BucketNotFound { bucket: String },

    /// The key is absent or its TTL has lapsed.
    #[error("cache is expired: {key}")]
    CacheExpired { key: String },

    /// The index references a bucket name that is not a plain file name.
    #[error("invalid bucket name: {bucket}")]
    InvalidBucket { bucket: String },

    /// A value or index document could not be serialized.
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// A persisted document or payload could not be decoded.
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem failure on read, write, remove or mkdir.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The value producer passed to `update` failed.
    #[error("updater failed: {0}")]
    Updater(#[source] Box<dyn StdError + Send + Sync>),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn encode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            what: what.into(),
            source,
        }
    }

    pub(crate) fn decode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            what: what.into(),
            source,
        }
    }

    /// Returns true for a normal cache miss rather than a fault.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::CacheExpired { .. })
    }
}
