// Startup module - banner, config summary and fatal config errors
//
// The banner is printed before the dashboard takes over the screen (or in
// headless mode). log_startup repeats the same summary through tracing so it
// shows up in the dashboard's logs pane.

use dialdeck::config::{Config, ConfigError, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
}

/// Print the startup banner and effective settings
pub fn print_startup(config: &Config) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}dialdeck{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Outbound-calling dashboard{RESET}");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    for (name, value) in settings_summary(config) {
        println!("    {DIM}{:<10}{RESET} {}", name, value);
    }
    println!();

    if !config.enable_tui {
        println!("  {YELLOW}▸{RESET} Headless mode {DIM}(Ctrl+C to exit){RESET}");
        println!();
    }
}

/// Same summary, through the log pipeline
pub fn log_startup(config: &Config) {
    tracing::info!("dialdeck v{}", VERSION);
    for (name, value) in settings_summary(config) {
        tracing::info!("  {:<10} {}", name, value);
    }
    tracing::info!("Ready. Polling {}", config.api_url);
}

fn settings_summary(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("dialer", config.api_url.clone()),
        (
            "polling",
            format!(
                "every {} ms, pause after {} failures",
                config.status.poll_interval_ms, config.status.max_failures
            ),
        ),
        (
            "leads",
            format!("fresh {} s, {} retries", config.leads.stale_secs, config.leads.retries),
        ),
        (
            "campaigns",
            format!(
                "fresh {} s, {} retries",
                config.campaigns.stale_secs, config.campaigns.retries
            ),
        ),
    ]
}

/// Report a config problem before anything else has started
pub fn print_config_error(e: &ConfigError) {
    let headline = match e {
        ConfigError::Read { .. } => "Cannot read configuration file",
        ConfigError::Parse { .. } => "Invalid configuration file",
        ConfigError::Invalid(_) => "Invalid configuration value",
    };

    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║  CONFIG ERROR - {:<45}║", headline);
    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
    if let Some(path) = e.path() {
        eprintln!("  File: {}\n", path.display());
    }
    eprintln!("  Error: {}\n", e);
    if matches!(e, ConfigError::Parse { .. }) {
        eprintln!("  Run `dialdeck config --reset` to start from the defaults.\n");
    }
}
