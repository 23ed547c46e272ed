//! sheetfill - fill contact columns of a sheet from a URL column
//!
//! Each invocation sends the next slice of URLs to a contact extraction
//! service, writes name/email/phone back next to them and checkpoints the
//! next row, so repeated runs cover the sheet exactly once.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "sheetfill")]
#[command(about = "Fill contact columns of a sheet from a URL column")]
#[command(version)]
struct Cli {
    /// Defaults to `run` (one checkpointed batch)
    #[command(subcommand)]
    command: Option<Command>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./sheetfill.toml or ~/.config/sheetfill/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// CSV sheet to fill
    #[arg(long, global = true)]
    sheet: Option<PathBuf>,

    /// Maximum rows per invocation
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Stop starting new rows after this many seconds
    #[arg(long, global = true)]
    time_budget_secs: Option<u64>,

    /// Pause after every request, in milliseconds
    #[arg(long, global = true)]
    delay_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Process the next batch of rows (or the whole sheet with --full)
    Run(cmd::run::RunArgs),
    /// Show the stored cursor and remaining rows
    Status,
    /// Clear the stored cursor so the next run starts over
    Reset,
    /// Check that the extraction service is up
    Health,
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let progress = Arc::new(sheetfill_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, the progress bar shows activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    sheetfill_core::init_logging(quiet, cli.debug, multi);

    let mut config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // CLI flags override the config file
    if let Some(sheet) = cli.sheet {
        config.sheet.path = sheet;
    }
    if let Some(size) = cli.batch_size {
        config.batch.size = size;
    }
    if let Some(secs) = cli.time_budget_secs {
        config.batch.time_budget_secs = secs;
    }
    if let Some(ms) = cli.delay_ms {
        config.batch.delay_ms = ms;
    }

    match cli.command.unwrap_or(Command::Run(cmd::run::RunArgs::default())) {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Status => cmd::status::run(&config).map(|()| ExitCode::SUCCESS),
        Command::Reset => cmd::reset::run(&config).map(|()| ExitCode::SUCCESS),
        Command::Health => cmd::health::run(&config).map(|()| ExitCode::SUCCESS),
        Command::Config => {
            cmd::print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}
