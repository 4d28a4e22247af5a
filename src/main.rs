//! # Snapshot Loader CLI (`loader`)
//!
//! The `loader` binary is the operational surface of the snapshot loader.
//! It provides commands for database initialization, on-demand and
//! scheduled scans, ledger statistics, and recovery of stuck files.
//!
//! ## Usage
//!
//! ```bash
//! loader --config ./config/loader.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `loader init` | Create the SQLite database and run schema migrations |
//! | `loader sources` | List providers, intake directories, and pending files |
//! | `loader scan <target>` | Load new snapshots (`all`, `github`, `jira`, `clickup`) |
//! | `loader stats [provider]` | Show ledger counts and the latest entry per provider |
//! | `loader release <provider> <filename>` | Mark a stuck entry failed so it is retried |
//! | `loader watch` | Scan all providers on a fixed interval |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! loader init --config ./config/loader.toml
//!
//! # See what the next scan would pick up
//! loader scan all --dry-run
//!
//! # Load only Jira snapshots
//! loader scan jira
//!
//! # Machine-readable statistics
//! loader stats --json
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use snapshot_loader::config::{self, Config};
use snapshot_loader::ingest::Loader;
use snapshot_loader::models::Provider;
use snapshot_loader::{logging, migrate, sources, stats};

/// Snapshot Loader CLI: idempotent ingestion of GitHub, Jira, and ClickUp
/// snapshot files.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/loader.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "loader",
    about = "Snapshot Loader: idempotent ingestion of work-tracking snapshots",
    version,
    long_about = "Snapshot Loader discovers snapshot files exported from GitHub, Jira, and \
    ClickUp, maps each provider's columns onto one canonical activity record, and stores \
    them in SQLite with a tracking ledger so every file is loaded exactly once."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/loader.toml`.
    #[arg(long, global = true, default_value = "./config/loader.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `file_tracking` and
    /// `platform_information` tables. Safe to run more than once.
    Init,

    /// List providers and their intake directories.
    ///
    /// Shows whether each provider is enabled, where its intake directory
    /// is, and how many files the next scan would process.
    Sources,

    /// Scan intake directories and load new snapshot files.
    ///
    /// Files already marked successful in the ledger are skipped.
    Scan {
        /// `all` for every enabled provider, or one of `github`, `jira`,
        /// `clickup`.
        #[arg(default_value = "all")]
        target: String,

        /// List the files that would be processed without loading them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show ledger statistics.
    Stats {
        /// Limit the report to one provider.
        provider: Option<String>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Release a file stuck in `processing`.
    ///
    /// Marks the entry `failed` so the next scan retries it. Only use this
    /// once the process that claimed the file is known to be gone.
    Release {
        /// Provider the file belongs to.
        provider: String,

        /// Snapshot filename, e.g. `jira_2024_08_22T13_30_00`.
        filename: String,
    },

    /// Scan all enabled providers on a fixed interval until interrupted.
    Watch {
        /// Override `[scheduler].interval_secs`.
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            let loader = Loader::open(&cfg).await?;
            sources::list_sources(&cfg, &loader).await?;
        }
        Commands::Scan { target, dry_run } => {
            let loader = Loader::open(&cfg).await?;
            run_scan(&cfg, &loader, &target, dry_run).await?;
        }
        Commands::Stats { provider, json } => {
            let provider = provider.map(|p| p.parse::<Provider>()).transpose()?;
            let loader = Loader::open(&cfg).await?;
            stats::run_stats(&cfg, loader.store(), provider, json).await?;
        }
        Commands::Release { provider, filename } => {
            let provider: Provider = provider.parse()?;
            let loader = Loader::open(&cfg).await?;
            match loader.store().release(provider, &filename).await? {
                Some(entry) => println!(
                    "released {}/{} (now {}); the next scan will retry it",
                    entry.provider, entry.filename, entry.status
                ),
                None => bail!("no tracking entry for {}/{}", provider, filename),
            }
        }
        Commands::Watch { interval_secs } => {
            let loader = Loader::open(&cfg).await?;
            let secs = interval_secs.unwrap_or(cfg.scheduler.interval_secs);
            run_watch(&loader, secs).await?;
        }
    }

    Ok(())
}

/// Resolve a scan target into the providers it covers.
fn scan_targets(cfg: &Config, target: &str) -> Result<Vec<Provider>> {
    if target.eq_ignore_ascii_case("all") {
        return Ok(cfg.intake.enabled_providers());
    }
    let provider: Provider = target.parse()?;
    if !cfg.intake.is_enabled(provider) {
        bail!(
            "provider '{}' is not enabled; add it to [intake].providers",
            provider
        );
    }
    Ok(vec![provider])
}

async fn run_scan(cfg: &Config, loader: &Loader, target: &str, dry_run: bool) -> Result<()> {
    let providers = scan_targets(cfg, target)?;

    if dry_run {
        println!("scan {} (dry run)", target);
        for provider in providers {
            let pending = loader.pending(provider).await?;
            println!("  {}: {} pending", provider, pending.len());
            for file in pending {
                println!("    {}", file.filename);
            }
        }
        return Ok(());
    }

    let total = match providers.as_slice() {
        [provider] if !target.eq_ignore_ascii_case("all") => loader.scan_provider(*provider).await?,
        _ => loader.scan_all().await?,
    };

    println!("scan {}", target);
    println!("  records stored: {}", total);
    println!("ok");
    Ok(())
}

async fn run_watch(loader: &Loader, secs: u64) -> Result<()> {
    if secs == 0 {
        bail!("watch interval must be greater than zero");
    }

    info!(interval_secs = secs, "starting scheduled scans");
    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match loader.scan_all().await {
                    Ok(total) => info!(records = total, "scheduled scan finished"),
                    Err(err) => error!(error = %err, "scheduled scan failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping scheduled scans");
                break;
            }
        }
    }

    Ok(())
}
