// TUI module - Terminal dashboard
//
// Sets up the terminal, runs the event loop and restores the terminal on the
// way out. The loop redraws after every keyboard event, tick or dispatcher
// notification; all engine state is read fresh on each frame.

pub mod app;
pub mod components;
pub mod ui;

use anyhow::{Context, Result};
use app::App;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dialdeck::dispatch::DispatchEvent;
use dialdeck::logging::LogBuffer;
use dialdeck::Dashboard;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Run the dashboard until the user quits
pub async fn run_tui(dashboard: Arc<Dashboard>, log_buffer: LogBuffer, api_url: String) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut events = dashboard.dispatcher.subscribe();
    let mut app = App::new(dashboard, log_buffer, api_url);
    app.initial_load();

    let result = run_event_loop(&mut terminal, &mut app, &mut events).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut broadcast::Receiver<DispatchEvent>,
) -> Result<()> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(200));

    loop {
        terminal
            .draw(|f| ui::draw(f, app))
            .context("Failed to draw terminal")?;

        tokio::select! {
            _ = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    if let Ok(Event::Key(key)) = event::read() {
                        app.handle_key(key);
                    }
                }
            } => {}

            _ = tick_interval.tick() => app.tick(),

            received = events.recv() => match received {
                Ok(event) => app.handle_dispatch_event(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Dashboard fell behind on dispatch events");
                }
                // The dispatcher lives as long as the dashboard; nothing more will arrive
                Err(broadcast::error::RecvError::Closed) => {}
            },
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
