//! Command Handler Module
//!
//! This module implements the `honoka` command-line surface. Each subcommand
//! maps onto exactly one [`CacheEngine`] operation; the handler runs it and
//! returns a [`Response`] whose `Display` output is what the binary prints.
//!
//! ## Supported Commands
//!
//! - `set <key> <value> <ttl>` - Cache a string value for `ttl` seconds
//! - `get <key>...` - Print the cached JSON for each key
//! - `delete <key>` - Remove a key and its bucket
//! - `list` - Print every index entry
//! - `outdated` - Print buckets no index entry references
//! - `clean` - Remove those buckets
//! - `version [--detail]` - Print version information
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ clap parse  │───>│  execute()  │───>│  Response   │     │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                       CacheEngine                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CacheError, CacheResult};
use crate::storage::{unix_now, CacheEngine, CleanResult, IndexEntry};
use crate::VERSION;
use bytes::Bytes;
use clap::Subcommand;
use std::ffi::OsString;
use std::fmt;

/// A single `honoka` subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Cache new data if the key is unused or its cache has expired
    Set {
        key: String,
        value: String,
        /// Time to live in seconds
        ttl: u64,
    },

    /// Get cached data for one or more keys
    Get {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Delete a cache entry and its bucket
    Delete { key: String },

    /// List cache index entries (not the cached data)
    List,

    /// List bucket files not referenced by the index
    Outdated,

    /// Remove bucket files not referenced by the index
    Clean,

    /// Print version information
    Version {
        /// Show library and client versions
        #[arg(short, long)]
        detail: bool,
    },
}

/// Result of running a [`Command`].
#[derive(Debug)]
pub enum Response {
    /// A mutation succeeded
    Success,
    /// `set` kept an existing fresh value
    AlreadyCached,
    /// One result per requested key, in request order
    Values(Vec<(String, CacheResult<Bytes>)>),
    /// Index entries
    Entries(Vec<IndexEntry>),
    /// Orphaned bucket file names
    Outdated(Vec<OsString>),
    /// Per-bucket reclamation outcomes
    Cleaned(Vec<CleanResult>),
    /// Version information
    Version { detail: bool },
}

impl Response {
    /// Returns true if any part of the command failed.
    ///
    /// A `get` that misses on any key counts as failed so scripts can tell.
    pub fn is_failure(&self) -> bool {
        match self {
            Response::Values(values) => values.iter().any(|(_, v)| v.is_err()),
            Response::Cleaned(results) => results.iter().any(|r| !r.is_success()),
            _ => false,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Success => writeln!(f, "success."),
            Response::AlreadyCached => writeln!(f, "already cached."),
            Response::Values(values) => {
                for (key, value) in values {
                    match value {
                        Ok(raw) => writeln!(f, "{}: {}", key, String::from_utf8_lossy(raw))?,
                        Err(e) => writeln!(f, "{}: {}", key, e)?,
                    }
                }
                Ok(())
            }
            Response::Entries(entries) => {
                let now = unix_now();
                for entry in entries {
                    writeln!(
                        f,
                        "{}\t{}\t{}\t{}s",
                        entry.key,
                        entry.bucket,
                        entry.expiration,
                        entry.remaining_ttl(now)
                    )?;
                }
                Ok(())
            }
            Response::Outdated(buckets) if buckets.is_empty() => {
                writeln!(f, "No-indexed cache data is NOTHING.")
            }
            Response::Outdated(buckets) => {
                for bucket in buckets {
                    writeln!(f, "{}", bucket.to_string_lossy())?;
                }
                Ok(())
            }
            Response::Cleaned(results) if results.is_empty() => writeln!(f, "Nothing to do"),
            Response::Cleaned(results) => {
                for result in results {
                    match &result.error {
                        None => writeln!(f, "{} (Success)", result.bucket.to_string_lossy())?,
                        Some(e) => {
                            writeln!(f, "{} (Error [{}])", result.bucket.to_string_lossy(), e)?
                        }
                    }
                }
                Ok(())
            }
            Response::Version { detail: true } => {
                writeln!(f, "Honoka: {}", VERSION)?;
                writeln!(f, "Client: {}", VERSION)
            }
            Response::Version { detail: false } => writeln!(f, "{}", VERSION),
        }
    }
}

/// Runs commands against a cache engine.
#[derive(Debug)]
pub struct CommandHandler {
    engine: CacheEngine,
}

impl CommandHandler {
    pub fn new(engine: CacheEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &CacheEngine {
        &self.engine
    }

    /// Executes a command and returns the response.
    ///
    /// `get` reports per-key failures inside the response. Every other command
    /// returns the first engine error.
    pub fn execute(&mut self, command: Command) -> Result<Response, CacheError> {
        match command {
            Command::Set { key, value, ttl } => self.cmd_set(&key, &value, ttl),
            Command::Get { keys } => Ok(self.cmd_get(keys)),
            Command::Delete { key } => {
                self.engine.delete(&key)?;
                Ok(Response::Success)
            }
            Command::List => Ok(Response::Entries(self.engine.list()?)),
            Command::Outdated => Ok(Response::Outdated(self.engine.outdated()?)),
            Command::Clean => Ok(Response::Cleaned(self.engine.clean()?)),
            Command::Version { detail } => Ok(Response::Version { detail }),
        }
    }

    /// SET key value ttl
    fn cmd_set(&mut self, key: &str, value: &str, ttl: u64) -> CacheResult<Response> {
        if self.engine.set(key, value, ttl)? {
            Ok(Response::Success)
        } else {
            Ok(Response::AlreadyCached)
        }
    }

    /// GET key [key ...]
    fn cmd_get(&mut self, keys: Vec<String>) -> Response {
        let values = keys
            .into_iter()
            .map(|key| {
                let value = self.engine.get(&key);
                (key, value)
            })
            .collect();
        Response::Values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use tempfile::TempDir;

    fn create_handler() -> (CommandHandler, TempDir) {
        let temp = TempDir::new().unwrap();
        let engine = CacheEngine::open(CacheConfig::with_root(temp.path())).unwrap();
        (CommandHandler::new(engine), temp)
    }

    fn run(handler: &mut CommandHandler, command: Command) -> String {
        handler.execute(command).unwrap().to_string()
    }

    fn set(key: &str, value: &str, ttl: u64) -> Command {
        Command::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        }
    }

    #[test]
    fn test_set_get() {
        let (mut handler, _temp) = create_handler();

        assert_eq!(run(&mut handler, set("name", "Ariz", 100)), "success.\n");

        let output = run(
            &mut handler,
            Command::Get {
                keys: vec!["name".to_string()],
            },
        );
        assert_eq!(output, "name: \"Ariz\"\n");
    }

    #[test]
    fn test_set_twice() {
        let (mut handler, _temp) = create_handler();

        run(&mut handler, set("name", "first", 100));
        assert_eq!(
            run(&mut handler, set("name", "second", 100)),
            "already cached.\n"
        );
    }

    #[test]
    fn test_get_reports_each_key() {
        let (mut handler, _temp) = create_handler();
        run(&mut handler, set("a", "1", 100));

        let response = handler
            .execute(Command::Get {
                keys: vec!["a".to_string(), "missing".to_string()],
            })
            .unwrap();

        assert!(response.is_failure());
        let output = response.to_string();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "a: \"1\"");
        assert_eq!(lines[1], "missing: cache is expired: missing");
    }

    #[test]
    fn test_delete() {
        let (mut handler, _temp) = create_handler();
        run(&mut handler, set("a", "1", 100));

        let output = run(
            &mut handler,
            Command::Delete {
                key: "a".to_string(),
            },
        );
        assert_eq!(output, "success.\n");
        assert!(handler.engine().entry("a").is_none());
    }

    #[test]
    fn test_list() {
        let (mut handler, _temp) = create_handler();
        assert_eq!(run(&mut handler, Command::List), "");

        run(&mut handler, set("b", "2", 100));
        run(&mut handler, set("a", "1", 100));

        let output = run(&mut handler, Command::List);
        let keys: Vec<&str> = output
            .lines()
            .map(|line| line.split('\t').next().unwrap())
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_list_shows_remaining_ttl() {
        let (mut handler, _temp) = create_handler();
        run(&mut handler, set("a", "1", 100));
        run(&mut handler, set("stale", "0", 0));

        let output = run(&mut handler, Command::List);
        let rows: Vec<Vec<&str>> = output.lines().map(|l| l.split('\t').collect()).collect();
        assert_eq!(rows.len(), 2);

        let entry = handler.engine().entry("a").unwrap();
        assert_eq!(rows[0][0], "a");
        assert_eq!(rows[0][1], entry.bucket);
        assert_eq!(rows[0][2], entry.expiration.to_string());
        let ttl: u64 = rows[0][3].strip_suffix('s').unwrap().parse().unwrap();
        assert!(ttl > 0 && ttl <= 100);

        // Expired entries still listed until accessed, with nothing left
        assert_eq!(rows[1][0], "stale");
        assert_eq!(rows[1][3], "0s");
    }

    #[test]
    fn test_outdated_and_clean() {
        let (mut handler, _temp) = create_handler();

        assert_eq!(
            run(&mut handler, Command::Outdated),
            "No-indexed cache data is NOTHING.\n"
        );
        assert_eq!(run(&mut handler, Command::Clean), "Nothing to do\n");

        handler.engine.buckets.write("orphan", "x").unwrap();

        assert_eq!(run(&mut handler, Command::Outdated), "orphan\n");
        assert_eq!(run(&mut handler, Command::Clean), "orphan (Success)\n");
        assert_eq!(run(&mut handler, Command::Clean), "Nothing to do\n");
    }

    #[test]
    fn test_clean_reports_failures_alongside_successes() {
        let response = Response::Cleaned(vec![
            CleanResult {
                bucket: OsString::from("b1"),
                error: None,
            },
            CleanResult {
                bucket: OsString::from("b2"),
                error: Some(CacheError::io(
                    "/tmp/b2",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                )),
            },
        ]);

        assert!(response.is_failure());
        let output = response.to_string();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "b1 (Success)");
        assert!(lines[1].starts_with("b2 (Error [I/O error at /tmp/b2"));
    }

    #[test]
    fn test_version() {
        let (mut handler, _temp) = create_handler();

        let output = run(&mut handler, Command::Version { detail: false });
        assert_eq!(output, format!("{}\n", VERSION));

        let output = run(&mut handler, Command::Version { detail: true });
        assert!(output.starts_with("Honoka: "));
        assert!(output.contains("Client: "));
    }

    #[test]
    fn test_engine_errors_propagate() {
        let (mut handler, temp) = create_handler();
        std::fs::write(temp.path().join("index"), "garbage").unwrap();

        let result = handler.execute(Command::List);
        assert!(matches!(result, Err(CacheError::Decode { .. })));
    }
}
