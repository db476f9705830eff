//! TraderDNA command line
//!
//! Reads wallet trade ledgers and benchmark returns as JSON and writes
//! wallet skill reports.
//!
//! # Commands
//!
//! - **analyze**: one request document in, one report out
//! - **batch**: JSON lines in, one result line per request out
//!
//! Logs go to stderr so stdout stays machine readable.

mod batch;
mod cache;
mod config;
mod error;
mod input;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use traderdna_core::Engine;

use crate::cache::ReportCache;
use crate::config::AppConfig;

#[derive(Parser)]
#[command(author, version, about = "Separate trading skill from market exposure", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./traderdna.{toml,json,yaml} when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single wallet request
    Analyze {
        /// Request document, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Recompute realized P&L from FIFO lots instead of trusting the ledger
        #[arg(long)]
        realize_fifo: bool,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },
    /// Analyze many wallets from JSON lines
    Batch {
        /// JSON lines file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Recompute realized P&L from FIFO lots instead of trusting the ledger
        #[arg(long)]
        realize_fifo: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("traderdna=info,traderdna_core=info")
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::info!(
        periods_per_year = config.analysis.periods_per_year,
        sampling_interval_secs = config.analysis.sampling_interval_secs,
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    let engine = Engine::new(config.analysis.clone())?;
    let cache = ReportCache::new(&config.cache);

    match cli.command {
        Commands::Analyze {
            input,
            realize_fifo,
            pretty,
        } => {
            let request = input::read_request(&input, realize_fifo)?;
            let report = cache
                .get_or_analyze(&request, || engine.analyze(&request))?;

            tracing::info!(
                wallet = %report.wallet(),
                recommendation = ?report.assessment().recommendation,
                tags = report.tags().len(),
                "Wallet analyzed"
            );

            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            if pretty || config.output.pretty {
                serde_json::to_writer_pretty(&mut out, report.as_ref())?;
            } else {
                serde_json::to_writer(&mut out, report.as_ref())?;
            }
            writeln!(out)?;
            out.flush()?;
        }
        Commands::Batch { input, realize_fifo } => {
            let requests = input::read_requests(input::open(&input)?, realize_fifo);
            tracing::info!(requests = requests.len(), "Starting batch");

            let lines = batch::run(&engine, &cache, requests);

            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            for line in &lines {
                serde_json::to_writer(&mut out, line)?;
                writeln!(out)?;
            }
            out.flush()?;

            let succeeded = lines.iter().filter(|l| l.is_ok()).count();
            tracing::info!(
                succeeded,
                failed = lines.len() - succeeded,
                "Batch complete"
            );
        }
    }

    Ok(())
}
