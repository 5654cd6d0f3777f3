//! Storage Module
//!
//! This module provides the file-backed cache: the index and bucket stores and
//! the engine that coordinates them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CacheEngine                           │
//! │     get / set / update / delete / expire / list             │
//! │     outdated / clean                                        │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │                               │
//!                ▼                               ▼
//!  ┌───────────────────────────┐   ┌───────────────────────────┐
//!  │        IndexStore         │   │        BucketStore        │
//!  │     <root>/index          │   │     <root>/buckets/*      │
//!  │  key -> bucket, expiry    │   │  sha256(key.expiration)   │
//!  └───────────────────────────┘   └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Whole-document index**: loaded once, rewritten in full on every mutation
//! - **Immutable buckets**: payloads are never edited in place
//! - **Lazy expiry**: expired keys are removed when accessed
//! - **Orphan reclamation**: `clean` removes buckets the index no longer references
//!
//! ## Example
//!
//! ```
//! use honoka::storage::CacheEngine;
//! use honoka::CacheConfig;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut engine = CacheEngine::open(CacheConfig::with_root(dir.path())).unwrap();
//!
//! engine.set("name", "Honoka", 3600).unwrap();
//! assert_eq!(engine.get("name").unwrap(), "\"Honoka\"");
//!
//! engine.delete("name").unwrap();
//! assert!(engine.get("name").unwrap_err().is_miss());
//! ```

pub mod bucket;
pub mod engine;
pub mod index;
pub mod reclaim;

// Re-export commonly used types
pub use bucket::{bucket_name, BucketStore};
pub use engine::CacheEngine;
pub use index::{unix_now, Index, IndexEntry, IndexStore};
pub use reclaim::CleanResult;
