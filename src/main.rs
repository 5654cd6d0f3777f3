//! Honoka - A File-Backed Key-Value Cache
//!
//! This is the entry point for the `honoka` command-line client.
//! It parses arguments, sets up logging, opens the cache and runs one command.

use anyhow::Context;
use clap::Parser;
use honoka::{CacheConfig, CacheEngine, Command, CommandHandler, Response};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Exit code for a command that ran but reported a failure (e.g. a cache miss)
const EXIT_PARTIAL_FAILURE: u8 = 1;

/// Exit code for an engine error
const EXIT_ERROR: u8 = 2;

/// Client tool for honoka (file-backed key-value cache)
#[derive(Debug, Parser)]
#[command(name = "honoka", version = honoka::VERSION)]
struct Cli {
    /// Cache root directory (default: ~/.honoka)
    #[arg(long, global = true, env = "HONOKA_ROOT")]
    root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log filter directive (e.g. "debug" or "honoka=trace"), overrides RUST_LOG and -v
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Resolves the cache location from `--root` or the home directory.
    fn cache_config(&self) -> anyhow::Result<CacheConfig> {
        match &self.root {
            Some(root) => Ok(CacheConfig::with_root(root)),
            None => CacheConfig::from_home().context("failed to locate cache root"),
        }
    }

    fn verbosity_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Builds the log filter: `--log-level`, then `RUST_LOG`, then `-v`.
    fn log_filter(&self) -> EnvFilter {
        match &self.log_level {
            Some(directive) => EnvFilter::new(directive),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.verbosity_level())),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging (stdout is reserved for command output)
    FmtSubscriber::builder()
        .with_env_filter(cli.log_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match run(cli) {
        Ok(response) => {
            print!("{}", response);
            if response.is_failure() {
                ExitCode::from(EXIT_PARTIAL_FAILURE)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Opens the cache and executes the requested command.
fn run(cli: Cli) -> anyhow::Result<Response> {
    // Version needs no cache on disk
    if let Command::Version { detail } = cli.command {
        return Ok(Response::Version { detail });
    }

    let config = cli.cache_config()?;
    debug!(root = %config.root().display(), "Opening cache");

    let engine = CacheEngine::open(config).context("failed to open cache")?;
    let mut handler = CommandHandler::new(engine);

    let response = handler.execute(cli.command)?;
    Ok(response)
}
