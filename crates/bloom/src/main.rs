use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use bloom::cli::commands::{self, ScanOptions};

#[derive(Parser)]
#[command(name = "bloom")]
#[command(about = "Bloom - turn a captured scan video into metrics, interpretations and suggestions")]
#[command(version)]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Suppress console messages (command output is still printed)
  #[arg(short, long, global = true)]
  quiet: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Upload a video and run the full analysis pipeline
  Scan {
    /// Path to the captured video; without one a synthetic result is produced
    video: Option<PathBuf>,
    /// Current pregnancy week (1-42)
    #[arg(short, long)]
    week: Option<u8>,
    /// Skip the analysis service and produce a synthetic result
    #[arg(long)]
    mock: bool,
    /// Base URL of the analysis service
    #[arg(long, env = "BLOOM_API_URL")]
    api_url: Option<String>,
  },
  /// Show the most recent saved scan
  Latest,
  /// Forget the most recent saved scan
  Clear,
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("bloom=debug,warn")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bloom=error"))
  };

  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

async fn handle(command: Command) -> Result<()> {
  match command {
    Command::Scan { video, week, mock, api_url } => {
      commands::scan(ScanOptions { video, week, mock, api_url }).await
    }
    Command::Latest => commands::latest(),
    Command::Clear => commands::clear(),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  init_tracing(cli.verbose);
  mabel::set_quiet(cli.quiet);

  handle(cli.command).await
}
