//! # cli: command-line entry point for emoji-map-sync
//!
//! Parses the subcommands, loads the configuration and hands off to
//! [`crate::synchronise::synchronise`]. Everything with domain meaning lives
//! in the library modules; this module only does CLI glue.
//!
//! ## Subcommands
//! - `check`: fetch, normalize and compare. Never writes.
//! - `update`: as `check`, then rewrite the local artifact when it changed.
//! - `sync`: as `check`, then propose the change through the rolling pull
//!   request. Needs the token and signing key in the environment.
//!
//! ## Output
//! The first stdout line is the run signal `changed=true|false`, followed by
//! a human summary. Under GitHub Actions, `changed`, `sha256` and (after a
//! proposal) `pull_request` and `commit` are appended to `$GITHUB_OUTPUT`.
//! Logs go to stderr, so stdout stays machine-readable.
//!
//! [`run`] is exported so integration tests can drive a whole invocation
//! with a constructed [`Cli`].

use crate::load_config::{load_config, load_config_for_publish};
use crate::synchronise::{synchronise, Mode, SyncReport};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Environment variable naming the file GitHub Actions reads step outputs from.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// CLI for emoji-map-sync: keep the committed emoji map in line with upstream.
#[derive(Parser)]
#[clap(
    name = "emoji-map-sync",
    version,
    about = "Fetch the upstream emoji dataset, compare it with the committed emoji map and propose updates"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report whether the emoji map is out of date without changing anything
    Check {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Rewrite the local emoji map when it is out of date
    Update {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Propose an out-of-date emoji map as a signed commit on the rolling pull request
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<SyncReport> {
    tracing::info!("trace_initialised");

    let (config_path, mode) = match cli.command {
        Commands::Check { config } => (config, Mode::Check),
        Commands::Update { config } => (config, Mode::Update),
        Commands::Sync { config } => (config, Mode::Sync),
    };

    let config = match mode {
        Mode::Sync => load_config_for_publish(&config_path)?,
        Mode::Check | Mode::Update => load_config(&config_path)?,
    };

    let report = synchronise(&config, mode)
        .await
        .context("Synchronisation failed")?;

    println!("{}", report.signal());
    emit_step_outputs(&report)?;
    print_summary(&report);

    tracing::info!(changed = report.changed(), "exit");
    Ok(report)
}

/// Append the run signal to `$GITHUB_OUTPUT` when running inside Actions.
fn emit_step_outputs(report: &SyncReport) -> Result<()> {
    let Some(path) = std::env::var_os(GITHUB_OUTPUT_ENV) else {
        return Ok(());
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {GITHUB_OUTPUT_ENV} file {path:?}"))?;

    let mut lines = vec![report.signal(), format!("sha256={}", report.sha256)];
    if let Some(pr) = &report.proposal {
        lines.push(format!("pull_request={}", pr.url));
        lines.push(format!("commit={}", pr.commit));
    }
    for line in lines {
        writeln!(file, "{line}").with_context(|| format!("Failed to write {GITHUB_OUTPUT_ENV}"))?;
    }
    tracing::debug!(path = ?path, "Wrote step outputs");
    Ok(())
}

fn print_summary(report: &SyncReport) {
    if !report.changed() {
        println!("Emoji map is up to date ({} entries).", report.total);
        return;
    }
    println!(
        "Emoji map changed: {} added, {} removed, {} modified ({} entries, sha256 {}).",
        report.summary.added.len(),
        report.summary.removed.len(),
        report.summary.modified.len(),
        report.total,
        report.sha256
    );
    if report.written {
        println!("Local emoji map rewritten.");
    }
    if let Some(pr) = &report.proposal {
        let state = if pr.created { "Opened" } else { "Updated" };
        println!("{state} pull request #{}: {} (commit {})", pr.number, pr.url, pr.commit);
    }
}
