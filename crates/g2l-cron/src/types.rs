//! Trigger schedule types.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use g2l_core::config::RelayConfig;
use g2l_core::{ConfigError, TimeWindow};

/// When the relay fires.
#[derive(Clone, Debug)]
pub enum TriggerSchedule {
    /// Every N minutes, aligned to the epoch (so on whole minutes).
    Every(u32),
    /// A cron expression (seconds field first).
    Cron(Box<cron::Schedule>),
}

impl TriggerSchedule {
    /// Fixed-interval schedule. Zero minutes is rejected.
    pub fn every(minutes: u32) -> Result<Self, ConfigError> {
        if minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "relay.intervalMinutes".into(),
                message: "interval must be at least one minute".into(),
            });
        }
        Ok(Self::Every(minutes))
    }

    /// Parse a cron expression.
    pub fn cron(expr: &str) -> Result<Self, ConfigError> {
        let schedule = cron::Schedule::from_str(expr.trim()).map_err(|e| ConfigError::Invalid {
            key: "relay.schedule".into(),
            message: format!("invalid cron expression '{expr}': {e}"),
        })?;
        Ok(Self::Cron(Box::new(schedule)))
    }

    /// A cron expression when one is configured, otherwise the interval.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
        match config.schedule.as_deref() {
            Some(expr) => Self::cron(expr),
            None => Self::every(config.interval_minutes),
        }
    }

    /// The first fire instant strictly after `now`.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Every(minutes) => {
                let period = i64::from(*minutes) * 60;
                if period == 0 {
                    return None;
                }
                let next = (now.timestamp().div_euclid(period) + 1) * period;
                DateTime::from_timestamp(next, 0)
            }
            Self::Cron(schedule) => schedule.after(&now).next(),
        }
    }

    /// Lookback for a run fired at `at`: the gap back to the previous fire.
    ///
    /// Consecutive scheduled runs therefore cover back-to-back windows, also
    /// for cron expressions with uneven spacing.
    pub fn lookback_before(&self, at: DateTime<Utc>) -> Option<Duration> {
        match self {
            Self::Every(minutes) => Some(Duration::minutes(i64::from(*minutes))),
            Self::Cron(schedule) => schedule.after(&at).next_back().map(|prev| at - prev),
        }
    }

    /// Window for a run fired at `at`.
    pub fn window_at(&self, at: DateTime<Utc>) -> Option<TimeWindow> {
        let lookback = self.lookback_before(at)?;
        TimeWindow::new(at, lookback).ok()
    }

    /// Human-readable description for status output.
    pub fn describe(&self) -> String {
        match self {
            Self::Every(1) => "every minute".to_string(),
            Self::Every(n) => format!("every {n} minutes"),
            Self::Cron(schedule) => format!("cron '{schedule}'"),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
