//! g2l CLI — entry point.
//!
//! # Commands
//!
//! - `g2l run [--at INSTANT]` — one relay pass now (or for a given instant)
//! - `g2l serve` — fire relay passes on the configured schedule
//! - `g2l status` — show configuration and schedule
//! - `g2l query [--at INSTANT]` — print the mailbox search for a window

mod helpers;
mod serve;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use g2l_channels::gmail::build_query;
use g2l_core::config::load_config;
use g2l_cron::TriggerSchedule;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// g2l — forward labelled Gmail messages to a LINE chat
#[derive(Parser)]
#[command(name = "g2l", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.g2l/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one relay pass and exit
    Run {
        /// Trigger instant (RFC 3339). Defaults to now, truncated to the minute.
        #[arg(long)]
        at: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Run relay passes on the configured schedule until Ctrl+C
    Serve {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and schedule
    Status,

    /// Print the mailbox search query for a window
    Query {
        /// Window end (RFC 3339). Defaults to now, truncated to the minute.
        #[arg(long)]
        at: Option<String>,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run { at, logs } => {
            init_logging(logs);
            run_once(config_path, at.as_deref()).await
        }
        Commands::Serve { logs } => {
            init_logging(logs);
            serve::run(config_path).await
        }
        Commands::Status => status::run(config_path),
        Commands::Query { at } => print_query(config_path, at.as_deref()),
    }
}

// ─────────────────────────────────────────────
// Run / query commands
// ─────────────────────────────────────────────

/// One manual pass. Fails only when the listing or the push fails.
async fn run_once(config_path: Option<&std::path::Path>, at: Option<&str>) -> Result<()> {
    let config = load_config(config_path);
    config.validate().context("invalid configuration")?;

    let trigger_at = helpers::resolve_trigger_instant(at)?;
    info!(at = %trigger_at, "manual relay run");

    let relay = helpers::build_relay(&config);
    let trigger = helpers::build_trigger(&config, relay)?;
    trigger.trigger_now(trigger_at).await
}

fn print_query(config_path: Option<&std::path::Path>, at: Option<&str>) -> Result<()> {
    let config = load_config(config_path);
    let at = helpers::resolve_trigger_instant(at)?;
    let schedule =
        TriggerSchedule::from_config(&config.relay).context("invalid relay schedule")?;
    let window = schedule
        .window_at(at)
        .with_context(|| format!("schedule has no fire before {at}"))?;
    println!("{}", build_query(&config.gmail.label, &window));
    Ok(())
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins when set; `--logs` forces debug output for g2l crates.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("g2l=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_at() {
        let cli = Cli::parse_from(["g2l", "run", "--at", "2024-03-01T12:30:00Z", "--logs"]);
        match cli.command {
            Commands::Run { at, logs } => {
                assert_eq!(at.as_deref(), Some("2024-03-01T12:30:00Z"));
                assert!(logs);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::parse_from(["g2l", "status", "--config", "/tmp/g2l.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/g2l.json")));
        assert!(matches!(cli.command, Commands::Status));
    }
}
