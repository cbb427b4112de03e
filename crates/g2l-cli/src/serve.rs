//! `g2l serve` — scheduled relay.
//!
//! Startup sequence:
//! 1. Load and validate config
//! 2. Build the Gmail source, LINE sink and relay
//! 3. Run the trigger loop until Ctrl+C, then wait for it to wind down

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{error, info};

use g2l_core::config::load_config;

use crate::helpers;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    helpers::print_banner();

    let config = load_config(config_path);
    config.validate().context("invalid configuration")?;

    let relay = helpers::build_relay(&config);
    let trigger = Arc::new(helpers::build_trigger(&config, relay)?);

    println!(
        "  {:<10} {}",
        "Label:".bold(),
        config.gmail.label
    );
    println!(
        "  {:<10} {}",
        "Schedule:".bold(),
        trigger.schedule().describe()
    );
    println!();

    let loop_trigger = trigger.clone();
    let mut handle = tokio::spawn(async move { loop_trigger.start().await });

    let result = tokio::select! {
        result = &mut handle => result,
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("  Shutting down...");
            info!("received Ctrl+C, shutting down");
            trigger.stop();
            // A run in progress finishes before the loop returns.
            handle.await
        }
    };

    match result {
        Ok(Ok(())) => info!("trigger loop exited"),
        Ok(Err(e)) => error!(error = %e, "trigger loop error"),
        Err(e) => error!(error = %e, "trigger task panicked"),
    }

    println!("  Relay stopped. Goodbye!");
    Ok(())
}
