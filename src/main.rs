// dialdeck - terminal dashboard for an outbound-calling dialer
//
// Architecture:
// - Engine (lib): status polling, lead/campaign caches, call dispatch
// - TUI (ratatui): live call state, lead table, session controls
// - Headless mode: the status poller alone, logging transitions
// - CLI: config management and one-shot dialer commands

mod cli;
mod startup;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use dialdeck::clock::system_clock;
use dialdeck::config::{Config, LogRotation};
use dialdeck::logging::{LogBuffer, TuiLogLayer};
use dialdeck::transport::HttpDialerApi;
use dialdeck::Dashboard;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config management never needs a valid config or a dialer
    if let Some(Commands::Config {
        show,
        reset,
        edit,
        path,
    }) = cli.command
    {
        return cli::handle_config(show, reset, edit, path);
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            startup::print_config_error(&e);
            std::process::exit(1);
        }
    };

    // The dashboard only runs without a subcommand
    let use_tui = config.enable_tui && cli.command.is_none();
    let log_buffer = LogBuffer::new();
    let _file_guard = init_tracing(&config, use_tui, &log_buffer);

    if let Some(command) = cli.command {
        return cli::run_command(command, &config).await;
    }

    if !use_tui {
        startup::print_startup(&config);
    }
    startup::log_startup(&config);

    let api = HttpDialerApi::new(&config.api_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    let dashboard = Arc::new(Dashboard::new(
        Arc::new(api),
        config.engine_settings(),
        system_clock(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = dashboard.spawn_polling(shutdown_rx);

    if use_tui {
        tracing::info!("Starting TUI");
        if let Err(e) = tui::run_tui(dashboard.clone(), log_buffer, config.api_url.clone()).await {
            tracing::error!("TUI error: {:?}", e);
        }
    } else {
        tracing::info!("TUI disabled, running in headless mode");
        run_headless(&dashboard).await?;
    }

    tracing::info!("Shutting down...");

    // If the send fails the poller has already stopped
    let _ = shutdown_tx.send(true);
    let _ = poller.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialise tracing with conditional output
///
/// Dashboard mode captures logs into the in-memory buffer (stderr output
/// would garble the display); everything else writes to stderr. File
/// logging adds a JSON layer on a rolling appender in either mode.
///
/// Precedence: RUST_LOG env var > config file > default "info"
fn init_tracing(
    config: &Config,
    use_tui: bool,
    log_buffer: &LogBuffer,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = format!("dialdeck={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let tui_layer = use_tui.then(|| TuiLogLayer::new(log_buffer.clone()));
    let stderr_layer = (!use_tui).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let (file_layer, guard) = if config.logging.file_enabled {
        match std::fs::create_dir_all(&config.logging.file_dir) {
            Ok(()) => {
                let dir = &config.logging.file_dir;
                let prefix = &config.logging.file_prefix;
                let file_appender = match config.logging.file_rotation {
                    LogRotation::Hourly => tracing_appender::rolling::hourly(dir, prefix),
                    LogRotation::Daily => tracing_appender::rolling::daily(dir, prefix),
                    LogRotation::Never => tracing_appender::rolling::never(dir, prefix),
                };

                // Writes happen on a background thread; the guard flushes on drop
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_ansi(false);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    config.logging.file_dir, e
                );
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tui_layer)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

/// Headless watcher: load what the dashboard would show, then poll until Ctrl+C
async fn run_headless(dashboard: &Dashboard) -> Result<()> {
    let (view, campaigns) = futures::join!(
        dashboard.go_to_page(1),
        dashboard.campaigns.list_campaigns()
    );

    match view.error {
        Some(e) => tracing::warn!(error = %e, "Could not load leads"),
        None => tracing::info!(
            total_leads = view.page.total_leads,
            total_pages = view.page.total_pages,
            "Leads loaded"
        ),
    }
    match campaigns.error {
        Some(e) => tracing::warn!(error = %e, "Could not load campaigns"),
        None => tracing::info!(count = campaigns.campaigns.len(), "Campaigns loaded"),
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    Ok(())
}
