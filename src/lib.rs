//! # Honoka - A File-Backed Key-Value Cache
//!
//! Honoka stores serializable values on the local filesystem under string keys,
//! each with a time-to-live. It is meant for CLIs and tools that want to cache
//! expensive results between runs without a server.
//!
//! ## Features
//!
//! - **TTL Support**: every value expires after a caller-chosen number of seconds
//! - **Immutable Buckets**: payloads are written once and never edited in place
//! - **First Writer Wins**: re-setting a fresh key keeps the original value
//! - **Orphan Reclamation**: `outdated` and `clean` find and remove unreferenced payloads
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               Honoka                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────────────────┐ │
//! │  │  honoka     │───>│  Command    │───>│         CacheEngine          │ │
//! │  │  (clap CLI) │    │  Handler    │    │  get/set/update/delete/...   │ │
//! │  └─────────────┘    └─────────────┘    └──────┬───────────────┬───────┘ │
//! │                                               │               │         │
//! │                                               ▼               ▼         │
//! │                                    ┌────────────────┐ ┌──────────────┐  │
//! │                                    │  IndexStore    │ │ BucketStore  │  │
//! │                                    │ ~/.honoka/index│ │ ~/.honoka/   │  │
//! │                                    │                │ │   buckets/   │  │
//! │                                    └────────────────┘ └──────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use honoka::{CacheConfig, CacheEngine};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut cache = CacheEngine::open(CacheConfig::with_root(dir.path())).unwrap();
//!
//! // Compute a value only when it is missing or expired
//! let answer: u32 = cache
//!     .update_decoded("answer", || Ok::<_, std::io::Error>(42), 3600)
//!     .unwrap();
//! assert_eq!(answer, 42);
//!
//! // Reclaim payloads nothing points at any more
//! let cleaned = cache.clean().unwrap();
//! assert!(cleaned.is_empty());
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: index store, bucket store and the cache engine
//! - [`commands`]: the command layer behind the `honoka` binary
//! - [`config`]: where the cache lives on disk
//! - [`error`]: the error type shared by every layer

pub mod commands;
pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{Command, CommandHandler, Response};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use storage::{CacheEngine, CleanResult, IndexEntry};

/// Version of Honoka
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
