//! Carapace: a governed entity ledger.
//!
//! Carapace is the persistence and policy core of a larger
//! knowledge-management system. It stores typed domain records
//! (contexts, roles, role assignments, work, services, capabilities,
//! bridges, policies) under explicit invariants and answers analytical
//! queries over them. Everything network-facing lives elsewhere and
//! calls in through [`ops::Ledger`].
//!
//! # Core Principles
//!
//! - **Local-first**: one storage handle per process, durable files,
//!   no network dependencies once open
//! - **Audited**: every accepted mutation appends to a rotating JSONL
//!   event log
//! - **Guarded**: invariant checks run before any store side effect;
//!   failures carry stable machine-readable codes
//! - **Backend-agnostic**: flat JSON files and a single SQLite table
//!   implement the same store contract and are interchangeable
//!
//! # Architecture
//!
//! The mutation corridor is: identifier factory → guards → entity store
//! → event log. Analytical services (capability admission, service KPI
//! evaluation, Pareto ranking, trust decay, gamma folds) are read-mostly
//! layers over the same store.
//!
//! # Crate Structure
//!
//! - [`core`]: errors, time, identifiers, config, store backends, event log
//! - [`domain`]: typed records and the invariant guards
//! - [`services`]: analytical operations
//! - [`ops`]: the operation surface ([`ops::Ledger`])
//!
//! The binary in `main.rs` is a thin inspection shell (init, stats,
//! list, events); it is not part of the compatibility surface.

pub mod core;
pub mod domain;
pub mod ops;
pub mod services;

use crate::core::config::LedgerConfig;
use crate::core::error::LedgerError;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "carapace",
    version = env!("CARGO_PKG_VERSION"),
    about = "Governed entity ledger"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a ledger root (config + data directory).
    Init {
        /// Directory to initialize (defaults to current working directory).
        #[clap(short, long)]
        dir: Option<PathBuf>,
    },
    /// Show store and event log statistics.
    Stats,
    /// Dump a collection as JSON, most recently updated first.
    List {
        #[clap(long)]
        collection: String,
    },
    /// Show the tail of the active event log.
    Events {
        #[clap(long, default_value = "20")]
        limit: usize,
    },
}

fn find_ledger_root(start_dir: &Path) -> Result<PathBuf, LedgerError> {
    let mut current = start_dir.to_path_buf();
    loop {
        if current.join(".carapace").exists() {
            return Ok(current.join(".carapace"));
        }
        if !current.pop() {
            return Err(LedgerError::not_found(
                "'.carapace' directory in current or parent directories; run `carapace init` first",
            ));
        }
    }
}

pub fn run() -> Result<(), LedgerError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    match cli.command {
        Command::Init { dir } => {
            let target = dir.unwrap_or(current_dir);
            let root = target.join(".carapace");
            fs::create_dir_all(root.join("data"))?;
            let config_path = LedgerConfig::write_default(&root)?;
            println!("{} {}", "●".bright_green(), config_path.display());
            println!("{} {}", "●".bright_green(), root.join("data").display());
            println!("Ledger initialized at {}", root.display());
        }
        Command::Stats => {
            let root = find_ledger_root(&current_dir)?;
            let config = LedgerConfig::load(&root)?;
            let ledger = ops::Ledger::open(&config)?;
            let collections = ledger.store_stats()?;
            let log = ledger.event_log_stats()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "collections": collections,
                    "event_log": log,
                }))?
            );
            ledger.shutdown();
        }
        Command::List { collection } => {
            let root = find_ledger_root(&current_dir)?;
            let config = LedgerConfig::load(&root)?;
            let ledger = ops::Ledger::open(&config)?;
            let items = ledger.dump_collection(&collection)?;
            println!("{}", serde_json::to_string_pretty(&items)?);
            ledger.shutdown();
        }
        Command::Events { limit } => {
            let root = find_ledger_root(&current_dir)?;
            let config = LedgerConfig::load(&root)?;
            let log_path = config.data_dir.join(crate::core::event_log::EVENT_LOG_NAME);
            if !log_path.exists() {
                println!("No events recorded.");
                return Ok(());
            }
            let content = fs::read_to_string(&log_path)?;
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(limit);
            for line in &lines[start..] {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
