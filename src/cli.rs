//! Command-line interface for citadel.

use clap::Parser;
use std::path::PathBuf;

/// Citadel - turn-based city strategy with random and language-model AI
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "citadel")]
#[command(about = "Turn-based city strategy engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Game configuration file (JSON). The built-in scenario is used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Play the whole match without a terminal UI, printing NDJSON snapshots to stdout.
    /// The configuration must set at least one victory condition.
    #[arg(long)]
    pub headless: bool,
}
