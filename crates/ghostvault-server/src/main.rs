//! GhostVault Server: headless daemon for dead man's switch monitoring
//!
//! Evaluates the vault's inactivity timer on an interval, reminds the owner
//! before the switch fires, and notifies the beneficiary once it has.
//!
//! # Usage
//!
//! ```bash
//! ghostvault-server --config /path/to/ghostvault-server.toml
//! ghostvault-server --check     # Run one check cycle and exit
//! ghostvault-server --validate  # Validate config and exit
//! ghostvault-server --ping      # Record a proof of life and exit
//! ```

mod config;
mod daemon;
mod state;

use anyhow::{Context, Result};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI args (minimal, no clap dependency needed)
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("/config/ghostvault-server.toml");
    let mut one_shot = false;
    let mut validate_only = false;
    let mut ping = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--check" | "--once" => {
                one_shot = true;
            }
            "--validate" => {
                validate_only = true;
            }
            "--ping" => {
                ping = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("ghostvault-server {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    let mut server_config = config::ServerConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    server_config.apply_env_overrides();

    server_config
        .validate()
        .context("Configuration validation failed")?;

    env_logger::Builder::new()
        .parse_filters(&server_config.server.log_level)
        .init();

    if validate_only {
        println!("Configuration is valid.");
        println!("  Vault:          {}", server_config.vault.label);
        println!("  Owner:          {}", server_config.vault.owner);
        println!("  Threshold:      {}", server_config.threshold()?);
        println!("  Heir:           {}", server_config.vault.heir_address);
        println!(
            "  Heir email:     {}",
            server_config.vault.heir_email.as_deref().unwrap_or("(none)")
        );
        println!(
            "  Check interval: {} secs",
            server_config.server.check_interval_secs
        );
        println!(
            "  Email notify:   {}",
            server_config.notifications.email.is_some()
        );
        println!("  State file:     {}", server_config.state_path().display());
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    if ping {
        let at = rt.block_on(daemon::record_ping(&server_config))?;
        println!("Proof of life recorded at {}", daemon::format_timestamp(at));
    } else if one_shot {
        log::info!("Running single check cycle…");
        let report = rt.block_on(daemon::run_check_cycle(&server_config))?;
        log::info!(
            "Done: {:?}, {} remaining (fired this cycle: {}, heir notified: {})",
            report.action,
            report.remaining,
            report.fired_now,
            report.heir_notified
        );
    } else {
        // Install Ctrl-C handler for graceful shutdown
        let shutdown = rt.block_on(async {
            tokio::select! {
                result = daemon::run(server_config) => result,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received shutdown signal. Exiting…");
                    Ok(())
                }
            }
        });

        if let Err(e) = shutdown {
            log::error!("Server error: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"GhostVault Server: headless dead man's switch daemon

USAGE:
    ghostvault-server [OPTIONS]

OPTIONS:
    -c, --config <PATH>   Config file path (default: /config/ghostvault-server.toml)
    --check, --once       Run a single check cycle and exit
    --validate            Validate config file and exit
    --ping                Record a proof of life attested by this host and exit
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    GHOSTVAULT_DATA_DIR         Data directory path
    GHOSTVAULT_CHECK_INTERVAL   Check interval in seconds
    GHOSTVAULT_LOG_LEVEL        Log level (error/warn/info/debug/trace)
    GHOSTVAULT_THRESHOLD_DAYS   Inactivity threshold in days (30-365)
    GHOSTVAULT_HEIR_ADDRESS     Beneficiary destination identifier
    GHOSTVAULT_HEIR_EMAIL       Beneficiary email
    GHOSTVAULT_SMTP_PASSWORD    SMTP password

EXAMPLES:
    # Run as daemon with config file
    ghostvault-server --config /path/to/config.toml

    # Single check (useful for cron jobs)
    ghostvault-server --config config.toml --check

    # Check in from this host
    ghostvault-server --config config.toml --ping
"#
    );
}
