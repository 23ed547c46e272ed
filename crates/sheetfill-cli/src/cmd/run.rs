//! `sheetfill run` - process the next batch

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use sheetfill_core::SharedProgress;
use sheetfill_extract::{BatchRunner, HttpExtractor, SystemClock};
use sheetfill_store::{CsvSheet, JsonFileStore};

use crate::config::Config;

/// Exit status after SIGINT/SIGTERM
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Process every row in one pass, ignoring and keeping the cursor
    #[arg(long)]
    pub full: bool,
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let batch = config.batch_config()?;
    let extractor = HttpExtractor::new(&config.api_config()?)?;
    let mut sheet = CsvSheet::open(&config.sheet.path)?;
    let checkpoint_path = config.checkpoint_path();
    let mut store = JsonFileStore::open(&checkpoint_path)?;
    let clock = SystemClock::new();

    sheetfill_core::install_signal_handlers().context("Failed to install signal handlers")?;

    log::info!("Sheet: {}", config.sheet.path.display());
    log::info!("  Checkpoint: {}", checkpoint_path.display());
    log::info!("  Endpoint: {}", config.api.endpoint);
    if !args.full {
        log::info!(
            "  Batch: {} rows, {}s budget",
            batch.batch_size,
            batch.time_budget.as_secs()
        );
    }

    let pb = progress.batch_bar(if args.full { "full" } else { "batch" }, 0);
    let mut runner = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &batch);
    let report = if args.full {
        runner.run_full(&pb)?
    } else {
        runner.run_batch(&pb)?
    };

    if progress.is_tty() {
        report.print();
    } else {
        report.log();
    }

    if sheetfill_core::is_shutdown_requested() {
        log::warn!("Interrupted");
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}
