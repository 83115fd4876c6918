mod app;
mod auth;
mod components;
mod engine;
mod export;
mod models;
mod store;
mod tui;

use anyhow::{Context, Result};
use app::App;
use crossterm::{
    event::DisableMouseCapture,
    terminal::{self, LeaveAlternateScreen},
};
use engine::Engine;
use ratatui::prelude::{CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tui::Tui;

/// Diagnostics go to a file: stdout belongs to the terminal UI.
const LOG_FILE: &str = "historial.log";

fn main() -> Result<()> {
    let _guard = CleanupGuard;

    init_tracing()?;

    let store = store::Store::open(store::DB_NAME)?;
    let engine = Engine::new(store);

    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let mut tui = Tui::new(terminal);
    tui.init()?;

    let mut app = App::new(engine);
    let res = app.run(&mut tui);

    tui.exit()?;

    if let Err(e) = res {
        eprintln!("Application Error: {e}");
    }
    Ok(())
}

fn init_tracing() -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .context("Failed to open the log file")?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

struct CleanupGuard;

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // Ignore errors during cleanup
        let _ = terminal::disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    }
}
