//! Bucket Store
//!
//! A bucket is an immutable file holding one JSON-encoded value. Its name is the
//! hex SHA-256 digest of `"<key>.<expiration>"`, so re-caching a key under a new
//! expiration produces a new file and leaves the old one behind as an orphan
//! for [`CacheEngine::clean`](crate::CacheEngine::clean) to reclaim.
//!
//! Files hold the encoded value exactly as produced by the encoder, with no
//! header or envelope.

use crate::config::ensure_dir;
use crate::error::{CacheError, CacheResult};
use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Computes the bucket name for a key cached until `expiration`.
pub fn bucket_name(key: &str, expiration: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(b".");
    hasher.update(expiration.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Returns true if `name` is a single path component with nothing to resolve.
fn is_plain_name(name: &OsStr) -> bool {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(first)), None) => first == name,
        _ => false,
    }
}

/// Reads and writes bucket files inside one directory.
///
/// Bucket names come from the index, which other processes may write, so every
/// name is checked to be a plain file name before it touches the filesystem.
#[derive(Debug, Clone)]
pub struct BucketStore {
    dir: PathBuf,
}

impl BucketStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `bucket`.
    ///
    /// Fails with [`CacheError::InvalidBucket`] if the name is empty, contains a
    /// separator, or is `.` or `..`.
    pub fn path_of(&self, bucket: impl AsRef<OsStr>) -> CacheResult<PathBuf> {
        let bucket = bucket.as_ref();
        if !is_plain_name(bucket) {
            return Err(CacheError::InvalidBucket {
                bucket: bucket.to_string_lossy().into_owned(),
            });
        }
        Ok(self.dir.join(bucket))
    }

    /// Encodes `value` and writes it to a file named `bucket`.
    ///
    /// Buckets are write-once. The payload goes to a temporary file that is
    /// moved into place only if no file named `bucket` exists yet, so readers
    /// never see a partial file. If the bucket already exists it is left
    /// untouched and its current payload is returned instead.
    pub fn write<T>(&self, bucket: &str, value: &T) -> CacheResult<Bytes>
    where
        T: Serialize + ?Sized,
    {
        let path = self.path_of(bucket)?;
        let encoded = serde_json::to_vec(value).map_err(|e| CacheError::encode("value", e))?;

        ensure_dir(&self.dir)?;
        let mut tmp =
            NamedTempFile::new_in(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        tmp.write_all(&encoded).map_err(|e| CacheError::io(tmp.path(), e))?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                debug!(bucket = %bucket, bytes = encoded.len(), "Wrote bucket");
                Ok(Bytes::from(encoded))
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(bucket = %bucket, "Bucket already exists, keeping it");
                self.read(bucket)
            }
            Err(e) => Err(CacheError::io(path, e.error)),
        }
    }

    /// Reads the raw payload of `bucket`.
    pub fn read(&self, bucket: &str) -> CacheResult<Bytes> {
        let path = self.path_of(bucket)?;
        match fs::read(&path) {
            Ok(raw) => Ok(Bytes::from(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CacheError::BucketNotFound {
                bucket: bucket.to_string(),
            }),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Returns true if the file backing `bucket` exists.
    pub fn exists(&self, bucket: &str) -> bool {
        self.path_of(bucket).map_or(false, |path| path.is_file())
    }

    /// Deletes `bucket`.
    ///
    /// A bucket that is already gone is not an error. Returns `true` if a file
    /// was removed.
    pub fn remove(&self, bucket: impl AsRef<OsStr>) -> CacheResult<bool> {
        let path = self.path_of(&bucket)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(bucket = %bucket.as_ref().to_string_lossy(), "Removed bucket");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Snapshot of every file name in the bucket directory, sorted.
    ///
    /// Names are returned as the OS reports them, including ones that are not
    /// valid UTF-8 and so can never be referenced by the index. Subdirectories
    /// are skipped. A missing bucket directory yields an empty list.
    pub fn list_all(&self) -> CacheResult<Vec<OsString>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let file_type = entry.file_type().map_err(|e| CacheError::io(entry.path(), e))?;
            if file_type.is_dir() {
                continue;
            }
            names.push(entry.file_name());
        }

        names.sort();
        Ok(names)
    }
}
