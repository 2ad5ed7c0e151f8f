//! Scan command implementation.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tagpatrol_patrol::config::DEFAULT_CONCURRENT_WORKERS;
use tagpatrol_patrol::{
    ConsoleReporter, JsonReporter, Patrol, PatrolConfig, Reporter, ScanOutcome, StaticFinder,
};
use tagpatrol_policy::PolicyParser;

/// Report output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary and findings
    Text,
    /// Full report as JSON
    Json,
}

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Path to the tag policy file
    #[arg(short, long, env = "TAGPATROL_POLICY")]
    pub policy: PathBuf,

    /// Path to the resource inventory file
    #[arg(short, long, env = "TAGPATROL_INVENTORY")]
    pub inventory: PathBuf,

    /// Number of resource definitions scanned concurrently
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENT_WORKERS, env = "TAGPATROL_WORKERS")]
    pub workers: usize,

    /// Abort on the first resource discovery failure
    #[arg(long)]
    pub stop_on_error: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Runs the scan command.
///
/// Non-compliant resources are reported but do not fail the command. A run
/// aborted by Ctrl-C or `--stop-on-error` prints its partial report and fails.
pub async fn run(args: &ScanArgs) -> Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling scan");
            interrupt.cancel();
        }
    });

    let outcome = execute(args, &cancel).await?;

    let use_colors = !args.no_color && io::stdout().is_terminal();
    let reporter = reporter(args.format, use_colors);
    reporter.report(&outcome.report, &mut io::stdout().lock())?;

    match outcome.aborted {
        Some(e) => Err(anyhow::Error::new(e).context("Scan aborted")),
        None => Ok(()),
    }
}

/// Loads the policy and inventory, then scans.
pub async fn execute(args: &ScanArgs, cancel: &CancellationToken) -> Result<ScanOutcome> {
    info!(policy = ?args.policy, inventory = ?args.inventory, "Running tag scan");

    let definitions = PolicyParser::new()
        .parse_file(&args.policy)
        .with_context(|| format!("Invalid policy {}", args.policy.display()))?;
    let finder = StaticFinder::from_inventory_file(&args.inventory)
        .with_context(|| format!("Invalid inventory {}", args.inventory.display()))?;

    let config = PatrolConfig::builder()
        .concurrent_workers(args.workers)
        .stop_on_error(args.stop_on_error)
        .build();
    let patrol = Patrol::new(Arc::new(finder), config)?;

    Ok(patrol.scan(cancel, definitions).await)
}

fn reporter(format: OutputFormat, use_colors: bool) -> Box<dyn Reporter> {
    match format {
        OutputFormat::Text => Box::new(ConsoleReporter::new().with_colors(use_colors)),
        OutputFormat::Json => Box::new(JsonReporter::new().with_pretty(true)),
    }
}
