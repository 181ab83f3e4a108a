//! Terminal spectator UI.
//!
//! AI cities are stepped automatically; a human city waits for a typed
//! command. Logs go to the log file, never to the terminal.

mod app;
mod input;
mod ui;

pub use app::{App, LOG_LIMIT, PendingPopup};
pub use input::{Input, map_key};

use crate::dispatcher::AiDispatcher;
use anyhow::Result;
use citadel_rules::{Outcome, TurnEngine};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Pause between AI actions so the match can be followed.
const AI_PACE: Duration = Duration::from_millis(150);

/// Input poll interval while waiting for a human.
const POLL: Duration = Duration::from_millis(100);

/// Runs the terminal UI until the user quits. Returns the outcome if the match finished.
#[instrument(skip_all)]
pub fn run_tui(engine: TurnEngine, dispatcher: AiDispatcher) -> Result<Option<Outcome>> {
    info!("Starting terminal UI");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(engine, dispatcher);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = ?err, "Terminal UI error");
    }
    res?;

    let outcome = app.engine().outcome();
    info!(?outcome, "Terminal UI closed");
    Ok(outcome)
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;
        if app.should_quit() {
            return Ok(());
        }

        if app.ai_turn() && app.popup().is_none() {
            app.mark_thinking();
            terminal.draw(|frame| ui::draw(frame, app))?;
            app.step_ai();
            drain_keys(app, AI_PACE)?;
            continue;
        }

        drain_keys(app, POLL)?;
    }
}

/// Handles key presses arriving within `wait`.
fn drain_keys(app: &mut App, wait: Duration) -> Result<()> {
    if event::poll(wait)?
        && let Event::Key(key) = event::read()?
        && let Some(input) = map_key(key)
    {
        app.handle(input);
    }
    Ok(())
}
