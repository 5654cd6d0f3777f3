//! Orphan Reclamation
//!
//! Buckets are never edited in place, so storage leaks whenever a bucket stops
//! being referenced by the index without being removed:
//!
//! - a crash between writing a bucket and persisting the index
//! - another process overwriting the index with its own entry for the same key
//! - bucket files copied in or left behind by older index documents
//!
//! [`CacheEngine::outdated`] finds these orphans by diffing the bucket
//! directory against the set of buckets the index references, and
//! [`CacheEngine::clean`] removes them.
//!
//! Reclamation is best-effort: one bucket failing to delete does not stop the
//! others, and every outcome is reported back to the caller.

use crate::error::{CacheError, CacheResult};
use crate::storage::engine::CacheEngine;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use tracing::{info, warn};

/// Outcome of removing one orphaned bucket.
#[derive(Debug)]
pub struct CleanResult {
    /// The bucket that was reclaimed, as named on disk
    pub bucket: OsString,
    /// Why removal failed, if it did
    pub error: Option<CacheError>,
}

impl CleanResult {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl CacheEngine {
    /// Returns the names of bucket files no index entry references.
    ///
    /// The index is reloaded from disk first so entries written by other
    /// processes are taken into account. File names that are not valid UTF-8
    /// can never be referenced, so they are always reported.
    pub fn outdated(&mut self) -> CacheResult<Vec<OsString>> {
        self.reload()?;

        let referenced: HashSet<&OsStr> = self
            .index
            .values()
            .map(|entry| OsStr::new(entry.bucket.as_str()))
            .collect();

        let orphans = self
            .buckets
            .list_all()?
            .into_iter()
            .filter(|bucket| !referenced.contains(bucket.as_os_str()))
            .collect();

        Ok(orphans)
    }

    /// Removes every bucket reported by [`outdated`](Self::outdated).
    ///
    /// # Returns
    ///
    /// One [`CleanResult`] per orphaned bucket. An empty list means there was
    /// nothing to do. Only failing to compute the orphan set is an `Err`.
    pub fn clean(&mut self) -> CacheResult<Vec<CleanResult>> {
        let orphans = self.outdated()?;
        let buckets = &self.buckets;
        Ok(reclaim(orphans, |bucket| buckets.remove(bucket)))
    }
}

/// Runs `remove` on every orphan, carrying on past failures.
fn reclaim<F>(orphans: Vec<OsString>, mut remove: F) -> Vec<CleanResult>
where
    F: FnMut(&OsStr) -> CacheResult<bool>,
{
    let results: Vec<CleanResult> = orphans
        .into_iter()
        .map(|bucket| {
            let error = remove(&bucket).err();
            if let Some(e) = &error {
                warn!(bucket = %bucket.to_string_lossy(), error = %e, "Failed to remove orphaned bucket");
            }
            CleanResult { bucket, error }
        })
        .collect();

    if !results.is_empty() {
        let removed = results.iter().filter(|r| r.is_success()).count();
        info!(
            removed = removed,
            failed = results.len() - removed,
            "Orphaned buckets cleaned up"
        );
    }

    results
}
