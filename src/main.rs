//! Citadel - command-line entry point.
//!
//! Runs one match, either headless (NDJSON snapshots on stdout) or in the
//! terminal UI.

#![warn(missing_docs)]

use anyhow::{Context, Result};
use citadel::cli::Cli;
use citadel::logging::init_logging;
use citadel::{AiDispatcher, Settings, run_headless, run_tui};
use citadel_rules::{GameConfig, TurnEngine};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, instrument};

fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging()?;
    run(cli)
}

#[instrument(skip_all, fields(config = ?cli.config, headless = cli.headless))]
fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env().context("Invalid environment settings")?;
    info!(ai_type = %settings.ai_type(), "Settings loaded");

    let config = match &cli.config {
        Some(path) => GameConfig::from_file(path)
            .with_context(|| format!("Failed to load game config {}", path.display()))?,
        None => {
            info!("No config given, using the built-in scenario");
            GameConfig::default()
        }
    };
    let config = Arc::new(config);

    let dispatcher = AiDispatcher::from_settings(&settings, &config)
        .context("Failed to start the AI")?;
    let engine = TurnEngine::new(config);

    if cli.headless {
        let mut dispatcher = dispatcher;
        let mut engine = engine;
        let stdout = std::io::stdout();
        let outcome = run_headless(&mut engine, &mut dispatcher, stdout.lock())?;
        info!(
            %outcome,
            fallbacks = dispatcher.fallback_count(),
            diagnostics = engine.diagnostics().len(),
            "Match finished"
        );
    } else {
        let outcome = run_tui(engine, dispatcher)?;
        info!(?outcome, "Session finished");
    }

    Ok(())
}
