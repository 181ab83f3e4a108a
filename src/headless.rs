//! Headless runner: plays the match to the end and streams NDJSON snapshots.

use anyhow::{Context, Result, bail};
use citadel_rules::{DecisionSource, Outcome, TurnEngine, TurnSnapshot};
use std::io::Write;
use tracing::{info, instrument};

/// Drives every city through `source` until the match is over.
///
/// Writes the opening snapshot, then one line per applied action. Nothing
/// else is written to `out`. A configuration without any victory predicate
/// never finishes, so it is refused before anything is written.
#[instrument(skip_all, fields(players = engine.state().cities().len()))]
pub fn run_headless<W: Write>(
    engine: &mut TurnEngine,
    source: &mut dyn DecisionSource,
    mut out: W,
) -> Result<Outcome> {
    let victory = engine.state().config().victory_conditions();
    if victory.nb_turns().is_none() && victory.resources_spent().is_none() {
        bail!("Headless mode needs a victory condition (nb_turns or resources_spent)");
    }

    info!("Starting headless match");
    write_snapshot(&mut out, &engine.snapshot())?;

    let mut actions = 0u64;
    loop {
        if let Some(outcome) = engine.outcome() {
            info!(%outcome, actions, "Headless match finished");
            out.flush().context("Failed to flush snapshot stream")?;
            return Ok(outcome);
        }

        let step = engine.step(source).context("Engine refused to step")?;
        actions += 1;
        write_snapshot(&mut out, &step.snapshot)?;
    }
}

fn write_snapshot<W: Write>(out: &mut W, snapshot: &TurnSnapshot) -> Result<()> {
    serde_json::to_writer(&mut *out, snapshot).context("Failed to serialize snapshot")?;
    writeln!(out).context("Failed to write snapshot")?;
    Ok(())
}
