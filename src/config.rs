//! Cache Location Configuration
//!
//! All persisted state lives under a single root directory:
//!
//! ```text
//! <root>/
//!   index            # key -> {Key, Bucket, Expiration} document
//!   buckets/         # one payload file per bucket name
//! ```
//!
//! The default root is `~/.honoka`. Tests and embedders pass their own root
//! with [`CacheConfig::with_root`].

use crate::error::{CacheError, CacheResult};
use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the directory created under the home directory.
pub const DEFAULT_DIR_NAME: &str = ".honoka";

/// File name of the index document inside the root.
pub const INDEX_FILE_NAME: &str = "index";

/// Directory name holding bucket files inside the root.
pub const BUCKETS_DIR_NAME: &str = "buckets";

/// Where the cache keeps its index and buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root directory of the cache
    root: PathBuf,
}

impl CacheConfig {
    /// Uses `<home>/.honoka` as the root.
    pub fn from_home() -> CacheResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            CacheError::io(
                DEFAULT_DIR_NAME,
                io::Error::new(io::ErrorKind::NotFound, "could not determine home directory"),
            )
        })?;
        Ok(Self::with_root(home.join(DEFAULT_DIR_NAME)))
    }

    /// Uses an explicit root directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the index document.
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    /// Directory holding the bucket files.
    pub fn buckets_dir(&self) -> PathBuf {
        self.root.join(BUCKETS_DIR_NAME)
    }
}

/// Creates `dir` and any missing parents with owner-only permissions.
pub(crate) fn ensure_dir(dir: &Path) -> CacheResult<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    builder.create(dir).map_err(|e| CacheError::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_derived_paths() {
        let config = CacheConfig::with_root("/var/cache/honoka");
        assert_eq!(config.root(), Path::new("/var/cache/honoka"));
        assert_eq!(config.index_path(), Path::new("/var/cache/honoka/index"));
        assert_eq!(config.buckets_dir(), Path::new("/var/cache/honoka/buckets"));
    }

    #[test]
    fn test_from_home_uses_dot_dir() {
        if let Ok(config) = CacheConfig::from_home() {
            assert!(config.root().ends_with(DEFAULT_DIR_NAME));
        }
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b");

        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());

        // Second call is a no-op
        ensure_dir(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_dir_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("private");
        ensure_dir(&dir).unwrap();

        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }
}
