//! `g2l status` — show configuration and schedule.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use g2l_core::config::{get_config_path, load_config, Config};
use g2l_core::utils::mask_secret;
use g2l_cron::TriggerSchedule;

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    println!();
    println!("{}", "📮 g2l Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        path.display(),
        if path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    // Gmail
    println!();
    println!("  {}", "Gmail:".bold());
    println!("    {:<16} {}", "API", config.gmail.api_base);
    println!("    {:<16} {}", "Mailbox", config.gmail.user_id);
    println!("    {:<16} {}", "Label", config.gmail.label);
    println!("    {:<16} {}", "Credentials", gmail_credential_status(&config));

    // LINE
    println!();
    println!("  {}", "LINE:".bold());
    println!("    {:<16} {}", "API", config.line.api_base);
    println!(
        "    {:<16} {}",
        "Token",
        secret_status(&config.line.channel_access_token)
    );
    println!(
        "    {:<16} {}",
        "Destination",
        if config.line.to.is_empty() {
            "· not configured".dimmed().to_string()
        } else {
            config.line.to.clone()
        }
    );

    // Schedule
    println!();
    match TriggerSchedule::from_config(&config.relay) {
        Ok(schedule) => {
            println!("  {:<18} {}", "Schedule:".bold(), schedule.describe());
            let lookback = match &schedule {
                TriggerSchedule::Every(minutes) => format!("{minutes} minute(s)"),
                TriggerSchedule::Cron(_) => "since the previous fire".to_string(),
            };
            println!("  {:<18} {}", "Lookback:".bold(), lookback);
            if let Some(next) = schedule.next_fire_after(Utc::now()) {
                println!(
                    "  {:<18} {}",
                    "Next run:".bold(),
                    next.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
        }
        Err(e) => println!("  {:<18} {}", "Schedule:".bold(), e.to_string().red()),
    }

    // Validation
    println!();
    match config.validate() {
        Ok(()) => println!("  {} ready to relay", "✓".green()),
        Err(e) => println!("  {} {}", "✗".red(), e),
    }
    println!();

    Ok(())
}

fn gmail_credential_status(config: &Config) -> String {
    if config.gmail.can_refresh() {
        format!("{} (refresh token)", "✓".green())
    } else if !config.gmail.access_token.is_empty() {
        format!(
            "{} (access token {})",
            "✓".green(),
            mask_secret(&config.gmail.access_token)
        )
    } else {
        "· not configured".dimmed().to_string()
    }
}

fn secret_status(secret: &str) -> String {
    if secret.is_empty() {
        "· not configured".dimmed().to_string()
    } else {
        format!("{} ({})", "✓".green(), mask_secret(secret))
    }
}
