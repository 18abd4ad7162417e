mod config;
mod dispatch;
mod flows;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{default_state_dir, resolve_settings, DEFAULT_LOG_FILTER};
use crate::dispatch::run_cli;

#[derive(Parser, Debug)]
#[command(name = "chainup")]
#[command(about = "Plan and record chain software upgrades", long_about = None)]
struct Cli {
    /// Configuration file (defaults to <state-dir>/chainup.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the completion ledger and the pending plan.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
    /// Log filter directive, e.g. `info` or `chainup_orchestrator=debug`.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the upgrade names this build recognizes.
    Names,
    /// Show recorded completions and whether the next upgrade is first-time.
    Status,
    /// Run the upgrade handler for a plan name against the stored ledger.
    Plan {
        name: String,
        #[arg(long, default_value_t = 0)]
        height: u64,
        /// Plan info JSON, e.g. `{"coreProposals":["a.js"]}`.
        #[arg(long)]
        info: Option<String>,
        /// Record the pending plan and the completion instead of a dry run.
        #[arg(long)]
        commit: bool,
    },
    /// Record a completed upgrade directly.
    MarkDone { name: String, height: u64 },
    /// Show or clear the recorded pending plan.
    Pending {
        #[arg(long)]
        clear: bool,
    },
    /// Print the base address of a plain or parameterized address.
    Address { addr: String },
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(
        cli.config.as_deref(),
        cli.state_dir.as_deref(),
        cli.log_level.as_deref(),
        default_state_dir,
    )?;
    init_tracing(&settings.log_filter);
    tracing::debug!(state_dir = %settings.state_dir.display(), "resolved settings");

    run_cli(cli.command, &settings)
}
