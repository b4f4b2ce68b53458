// CLI module - command-line argument parsing and handlers
//
// With no subcommand the binary runs the dashboard (or the headless watcher
// when DIALDECK_NO_TUI is set). Subcommands either manage the config file or
// make a single request against the dialer and print the result.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dialdeck::clock::system_clock;
use dialdeck::config::{Config, VERSION};
use dialdeck::dispatch::DispatchOutcome;
use dialdeck::model::{Lead, SessionAck};
use dialdeck::transport::HttpDialerApi;
use dialdeck::{Dashboard, DispatchError};
use std::io::Write;
use std::process::Command;
use std::sync::Arc;

/// dialdeck - terminal dashboard for an outbound-calling dialer
#[derive(Parser)]
#[command(name = "dialdeck")]
#[command(version = VERSION)]
#[command(about = "Terminal dashboard for an outbound-calling dialer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(long)]
        edit: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Show the dialer's current call state
    Status,

    /// List one page of leads
    Leads {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// List available campaigns
    Campaigns,

    /// Start a call to a lead, by its number in the lead list (1-based)
    Call {
        lead: u64,

        #[arg(long)]
        campaign: Option<String>,
    },

    /// Call the lead after the last one on a page
    Next {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long)]
        campaign: Option<String>,
    },

    /// End the current call
    End {
        /// Do not continue to the next lead afterwards
        #[arg(long)]
        no_auto_next: bool,
    },

    /// Stop the current call and any auto-next sequence
    Stop,

    /// Turn automatic dialing of the next lead on or off
    AutoNext {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config subcommand
// ─────────────────────────────────────────────────────────────────────────────

pub fn handle_config(show: bool, reset: bool, edit: bool, path: bool) -> Result<()> {
    if path {
        handle_config_path()
    } else if show {
        handle_config_show()
    } else if reset {
        handle_config_reset()
    } else if edit {
        handle_config_edit()
    } else {
        println!("Usage: dialdeck config [--show|--reset|--edit|--path]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --reset   Reset config file to defaults");
        println!("  --edit    Open config file in $EDITOR");
        println!("  --path    Show config file path");
        Ok(())
    }
}

fn config_path() -> Result<std::path::PathBuf> {
    Config::config_path().context("Could not determine config path")
}

fn handle_config_path() -> Result<()> {
    println!("{}", config_path()?.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let config = Config::load()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    println!();
    let path = config_path()?;
    if path.exists() {
        println!("# Source: {}", path.display());
    } else {
        println!("# Source: defaults (no config file)");
    }
    if !config.enable_tui {
        println!("# DIALDECK_NO_TUI is set: headless mode");
    }
    Ok(())
}

fn handle_config_reset() -> Result<()> {
    let path = config_path()?;

    if path.exists() {
        eprint!("Config file exists at {}. Overwrite? [y/N] ", path.display());
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    // Config::default().to_toml() is the single source of truth
    Config::default()
        .save()
        .with_context(|| format!("Error writing config to {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

fn handle_config_edit() -> Result<()> {
    let path = config_path()?;

    if !path.exists() {
        Config::ensure_config_exists();
        println!("Created new config file: {}", path.display());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        });

    println!("Opening {} with {}", path.display(), editor);

    let status = Command::new(&editor).arg(&path).status().with_context(|| {
        format!("Failed to launch editor '{}' (set $EDITOR to your preferred editor)", editor)
    })?;
    if !status.success() {
        bail!("Editor exited with status: {}", status);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Dialer subcommands
// ─────────────────────────────────────────────────────────────────────────────

fn dashboard(config: &Config) -> Result<Dashboard> {
    let api = HttpDialerApi::new(&config.api_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    Ok(Dashboard::new(Arc::new(api), config.engine_settings(), system_clock()))
}

/// Run a one-shot dialer command
pub async fn run_command(command: Commands, config: &Config) -> Result<()> {
    let dash = dashboard(config)?;

    match command {
        Commands::Config {
            show,
            reset,
            edit,
            path,
        } => handle_config(show, reset, edit, path),
        Commands::Status => print_status(&dash).await,
        Commands::Leads { page } => print_leads(&dash, page).await,
        Commands::Campaigns => print_campaigns(&dash).await,
        Commands::Call { lead, campaign } => {
            if lead == 0 {
                bail!("Lead numbers start at 1");
            }
            select_campaign(&dash, campaign);
            let outcome = dash.start_index(lead - 1).await.map_err(dispatch_failure)?;
            report_start(&dash, outcome).await
        }
        Commands::Next { page, campaign } => {
            let view = dash.go_to_page(page).await;
            if let Some(e) = view.error {
                bail!("Could not load page {}: {}", page, e);
            }
            select_campaign(&dash, campaign);
            let outcome = dash.call_next().await.map_err(dispatch_failure)?;
            report_start(&dash, outcome).await
        }
        Commands::End { no_auto_next } => {
            let ack = dash.dispatcher.end_call(!no_auto_next).await.map_err(dispatch_failure)?;
            report_session("Call ended", &ack);
            Ok(())
        }
        Commands::Stop => {
            let ack = dash.dispatcher.stop_all().await.map_err(dispatch_failure)?;
            report_session("Stopped", &ack);
            Ok(())
        }
        Commands::AutoNext { state } => {
            let enabled = matches!(state, Toggle::On);
            let ack = dash.dispatcher.set_auto_next(enabled).await.map_err(dispatch_failure)?;
            let label = if enabled { "Auto-next enabled" } else { "Auto-next disabled" };
            report_session(label, &ack);
            Ok(())
        }
    }
}

fn dispatch_failure(e: DispatchError) -> anyhow::Error {
    let message = e.user_message();
    anyhow::Error::new(e).context(message)
}

fn select_campaign(dash: &Dashboard, campaign: Option<String>) {
    if let Some(key) = campaign {
        dash.campaigns.select(key);
    }
}

async fn print_status(dash: &Dashboard) -> Result<()> {
    dash.status.refresh_now().await;
    let view = dash.status.snapshot();
    if let Some(e) = view.error {
        bail!("Could not read call status: {}", e);
    }

    let status = view.status;
    println!("status:    {}", status.status);
    println!("auto-next: {}", if status.auto_next { "on" } else { "off" });
    if let Some(campaign) = status.campaign_label.or(status.campaign) {
        println!("campaign:  {}", campaign);
    }
    if let (Some(index), Some(lead)) = (status.lead_index, status.lead) {
        println!("lead:      #{} {}", index + 1, describe_lead(&lead));
    }
    Ok(())
}

async fn print_leads(dash: &Dashboard, page: u32) -> Result<()> {
    let view = dash.go_to_page(page).await;
    if let Some(e) = view.error {
        bail!("Could not load page {}: {}", page, e);
    }

    let page = view.page;
    println!(
        "Page {} of {} ({} leads total)",
        page.page, page.total_pages, page.total_leads
    );
    for (row, lead) in page.leads.iter().enumerate() {
        println!("{:>6}  {}", page.start_index + row as u64 + 1, describe_lead(lead));
    }
    Ok(())
}

async fn print_campaigns(dash: &Dashboard) -> Result<()> {
    let list = dash.campaigns.list_campaigns().await;
    if let Some(e) = list.error {
        bail!("Could not load campaigns: {}", e);
    }
    for campaign in list.campaigns {
        println!("{:<20} {}", campaign.key, campaign.label);
    }
    Ok(())
}

async fn report_start(dash: &Dashboard, outcome: DispatchOutcome) -> Result<()> {
    match outcome {
        DispatchOutcome::Started(ack) => {
            let index = ack.lead_index.map(|i| format!("#{}", i + 1)).unwrap_or_default();
            let campaign = ack.campaign_label.or(ack.campaign).unwrap_or_default();
            println!("Calling lead {} {}", index, campaign);
        }
        DispatchOutcome::AlreadyInFlight => println!("A start for this lead is already pending"),
        DispatchOutcome::Busy { pending } => {
            println!("Lead #{} is still being started; try again shortly", pending + 1)
        }
    }

    // Show what the dialer reports now that the start is acknowledged
    dash.status.refresh_now().await;
    if let Some(lead) = dash.status.get_status().lead {
        println!("On call with {}", describe_lead(&lead));
    }
    Ok(())
}

fn report_session(label: &str, ack: &SessionAck) {
    match ack.auto_next {
        Some(auto_next) => println!(
            "{} (auto-next {})",
            label,
            if auto_next { "on" } else { "off" }
        ),
        None => println!("{}", label),
    }
    if ack.auto_next_started == Some(true) {
        println!("Next lead is being dialed");
    }
}

fn describe_lead(lead: &Lead) -> String {
    format!(
        "{}, {} at {}  {}  {}",
        lead.prospect_name, lead.job_title, lead.company_name, lead.phone, lead.timezone
    )
}
