//! Shared CLI helpers — wiring, trigger instants, report printing.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;

use g2l_channels::{GmailSource, LineSink};
use g2l_core::config::Config;
use g2l_cron::{IntervalTrigger, OnTickFn, TriggerSchedule};
use g2l_relay::{truncate_to_minute, Relay, RelaySettings, RunReport};

/// Build the relay from config: Gmail source, LINE sink.
pub fn build_relay(config: &Config) -> Arc<Relay> {
    Arc::new(Relay::new(
        Arc::new(GmailSource::new(config.gmail.clone())),
        Arc::new(LineSink::new(&config.line)),
        RelaySettings::from_config(config),
    ))
}

/// Build a trigger whose tick runs `relay` and prints the outcome.
pub fn build_trigger(config: &Config, relay: Arc<Relay>) -> Result<IntervalTrigger> {
    let schedule =
        TriggerSchedule::from_config(&config.relay).context("invalid relay schedule")?;

    let on_tick: OnTickFn = Arc::new(move |window| {
        let relay = relay.clone();
        Box::pin(async move {
            let report = relay.run(&window).await?;
            print_report(window.reference(), &report);
            anyhow::Ok(())
        })
    });

    Ok(IntervalTrigger::new(schedule, Some(on_tick)))
}

/// Parse `--at`, or take the current instant truncated to the minute.
pub fn resolve_trigger_instant(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("invalid --at instant '{raw}', expected RFC 3339")),
        None => Ok(truncate_to_minute(Utc::now())),
    }
}

/// One-line summary of a finished run.
pub fn format_report(report: &RunReport) -> String {
    if report.is_idle() {
        return "no message found".to_string();
    }
    let mut line = format!("forwarded {}/{}", report.forwarded, report.listed);
    if !report.fetch_failures.is_empty() {
        line.push_str(&format!(", skipped {}", report.fetch_failures.join(", ")));
    }
    if !report.ack_failures.is_empty() {
        line.push_str(&format!(", still unread {}", report.ack_failures.join(", ")));
    }
    line
}

pub fn print_report(at: DateTime<Utc>, report: &RunReport) {
    let stamp = at.format("%Y-%m-%d %H:%M:%S").to_string();
    let summary = format_report(report);
    if report.fetch_failures.is_empty() && report.ack_failures.is_empty() {
        println!("  {} {}", stamp.dimmed(), summary);
    } else {
        println!("  {} {}", stamp.dimmed(), summary.yellow());
    }
}

/// Print the banner shown when serving.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "📮 g2l".cyan().bold(), version.dimmed());
    println!("{}", "Gmail → LINE relay. Ctrl+C to stop.".dimmed());
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
