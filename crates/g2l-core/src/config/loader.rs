//! Config loader — reads `~/.g2l/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.g2l/config.json`
//! 3. Environment variables `G2L_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to deserialize config: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `G2L_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `G2L_GMAIL__API_BASE`, `G2L_GMAIL__USER_ID`, `G2L_GMAIL__LABEL`
/// - `G2L_GMAIL__ACCESS_TOKEN`, `G2L_GMAIL__REFRESH_TOKEN`
/// - `G2L_GMAIL__CLIENT_ID`, `G2L_GMAIL__CLIENT_SECRET`, `G2L_GMAIL__TOKEN_URI`
/// - `G2L_LINE__API_BASE`, `G2L_LINE__CHANNEL_ACCESS_TOKEN`, `G2L_LINE__TO`
/// - `G2L_RELAY__INTERVAL_MINUTES`, `G2L_RELAY__SCHEDULE`
fn apply_env_overrides(mut config: Config) -> Config {
    let gmail = &mut config.gmail;
    apply_string_env(&mut gmail.api_base, "G2L_GMAIL__API_BASE");
    apply_string_env(&mut gmail.user_id, "G2L_GMAIL__USER_ID");
    apply_string_env(&mut gmail.label, "G2L_GMAIL__LABEL");
    apply_string_env(&mut gmail.access_token, "G2L_GMAIL__ACCESS_TOKEN");
    apply_string_env(&mut gmail.refresh_token, "G2L_GMAIL__REFRESH_TOKEN");
    apply_string_env(&mut gmail.client_id, "G2L_GMAIL__CLIENT_ID");
    apply_string_env(&mut gmail.client_secret, "G2L_GMAIL__CLIENT_SECRET");
    apply_string_env(&mut gmail.token_uri, "G2L_GMAIL__TOKEN_URI");

    let line = &mut config.line;
    apply_string_env(&mut line.api_base, "G2L_LINE__API_BASE");
    apply_string_env(&mut line.channel_access_token, "G2L_LINE__CHANNEL_ACCESS_TOKEN");
    apply_string_env(&mut line.to, "G2L_LINE__TO");

    if let Ok(val) = std::env::var("G2L_RELAY__INTERVAL_MINUTES") {
        match val.parse::<u32>() {
            Ok(n) => config.relay.interval_minutes = n,
            Err(e) => warn!(value = %val, error = %e, "ignoring invalid G2L_RELAY__INTERVAL_MINUTES"),
        }
    }
    if let Ok(val) = std::env::var("G2L_RELAY__SCHEDULE") {
        config.relay.schedule = if val.is_empty() { None } else { Some(val) };
    }

    config
}

fn apply_string_env(field: &mut String, var: &str) {
    if let Ok(val) = std::env::var(var) {
        *field = val;
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
