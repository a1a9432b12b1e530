//! # flatsync CLI
//!
//! Command-line interface for the flat-content synchronization engine.
//!
//! ## Usage
//!
//! ```bash
//! flatsync --config ./flatsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `flatsync init` | Create the fingerprint table |
//! | `flatsync check <dir>` | Scan a content directory and report issues, writing nothing |
//! | `flatsync load <dir>` | Check, then commit the delta in one transaction |
//!
//! `check` and `load` are deliberately separate: `load` re-runs the check,
//! prints everything it found, and refuses to write while errors are
//! present unless `--force` is passed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use flatsync::config::{self, Config};
use flatsync::db;
use flatsync::loader::ContentLoader;
use flatsync::migrate;
use flatsync::models::SyncCounts;
use flatsync::render::PassthroughRenderer;
use flatsync::report::Reporter;
use flatsync::store::LocalFileStore;

/// Reconcile flat content files into relational table rows.
#[derive(Parser)]
#[command(
    name = "flatsync",
    about = "Reconcile flat content files into relational table rows",
    version,
    long_about = "flatsync scans a directory of content files (YAML front matter plus body \
    text), derives routes, hierarchy and translation links from the file tree, and applies \
    the minimal insert/update/delete set to the matching database table in one transaction. \
    Content fingerprints make repeated runs over unchanged files no-ops."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./flatsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the fingerprint table.
    ///
    /// Creates the engine's own bookkeeping table. Content tables are
    /// application-owned and are not created here. Idempotent.
    Init,

    /// Scan a content directory and report issues without writing.
    ///
    /// Prints every warning and error the scan produced, followed by the
    /// counts the load phase would apply. Exits nonzero when errors are
    /// present.
    Check {
        /// Content-type directory under the content root (also the table name).
        dir: String,

        /// Restrict the run to these comma-separated subdirectories.
        #[arg(long)]
        subdir: Option<String>,
    },

    /// Check, then commit the changes to the database.
    ///
    /// Aborts before any write when the check phase reported errors,
    /// unless `--force` is passed. New records get their allocated id
    /// written back into their files after the commit.
    Load {
        /// Content-type directory under the content root (also the table name).
        dir: String,

        /// Restrict the run to these comma-separated subdirectories.
        #[arg(long)]
        subdir: Option<String>,

        /// Commit even when the check phase reported errors.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { dir, subdir } => run_check(&cfg, &dir, subdir.as_deref()).await,
        Commands::Load { dir, subdir, force } => {
            run_load(&cfg, &dir, subdir.as_deref(), force).await
        }
    }
}

async fn run_check(cfg: &Config, dir: &str, subdir: Option<&str>) -> anyhow::Result<ExitCode> {
    let pool = db::connect(cfg).await?;
    let store = LocalFileStore::new(&cfg.content.root);
    let renderer = PassthroughRenderer;
    let loader = ContentLoader::new(&pool, cfg, &store, &renderer, dir, subdir);

    let mut reporter = Reporter::new();
    let checked = loader.check(&mut reporter).await?;
    reporter.print();

    print_counts("check", dir, checked.counts());
    pool.close().await;

    if reporter.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        println!("ok");
        Ok(ExitCode::SUCCESS)
    }
}

async fn run_load(
    cfg: &Config,
    dir: &str,
    subdir: Option<&str>,
    force: bool,
) -> anyhow::Result<ExitCode> {
    let pool = db::connect(cfg).await?;
    let store = LocalFileStore::new(&cfg.content.root);
    let renderer = PassthroughRenderer;
    let loader = ContentLoader::new(&pool, cfg, &store, &renderer, dir, subdir);

    let mut reporter = Reporter::new();
    let checked = loader.check(&mut reporter).await?;
    reporter.print();

    if reporter.has_errors() && !force {
        eprintln!("Aborting: the check phase reported errors. Pass --force to load anyway.");
        pool.close().await;
        return Ok(ExitCode::FAILURE);
    }

    let counts = loader.load(&checked).await?;
    print_counts("load", dir, counts);
    println!("ok");

    pool.close().await;
    Ok(ExitCode::SUCCESS)
}

fn print_counts(phase: &str, dir: &str, counts: SyncCounts) {
    println!("{} {}", phase, dir);
    println!("  scanned: {} files", counts.scanned);
    println!("  created: {}", counts.created);
    println!("  updated: {}", counts.updated);
    println!("  deleted: {}", counts.deleted);
}
