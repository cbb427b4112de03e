//! Configuration schema.
//!
//! Hierarchy: `Config` → `GmailConfig`, `LineConfig`, `RelayConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default Gmail REST API base.
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

/// Default Google OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Default LINE Messaging API base.
pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

/// Label that marks mail for forwarding.
pub const DEFAULT_FORWARD_LABEL: &str = "forward-to-line";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.g2l/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub gmail: GmailConfig,
    pub line: LineConfig,
    pub relay: RelayConfig,
}

impl Config {
    /// Check that everything a run needs is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gmail.has_credentials() {
            return Err(ConfigError::Missing {
                key: "gmail.accessToken".into(),
                hint: "Set an access token, or refreshToken + clientId + clientSecret.".into(),
            });
        }
        if self.line.channel_access_token.is_empty() {
            return Err(ConfigError::Missing {
                key: "line.channelAccessToken".into(),
                hint: "Issue a long-lived channel access token in the LINE console.".into(),
            });
        }
        if self.line.to.is_empty() {
            return Err(ConfigError::Missing {
                key: "line.to".into(),
                hint: "Set the user, group or room id to push to.".into(),
            });
        }
        if self.gmail.label.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "gmail.label".into(),
                message: "label must not be empty".into(),
            });
        }
        if let Some(expr) = &self.relay.schedule {
            if expr.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "relay.schedule".into(),
                    message: "schedule must not be blank".into(),
                });
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Gmail
// ─────────────────────────────────────────────

/// Mailbox source settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GmailConfig {
    /// REST API base URL.
    pub api_base: String,
    /// Mailbox owner; `me` is the authenticated user.
    pub user_id: String,
    /// Label that marks mail for forwarding.
    pub label: String,
    /// Bearer token used directly when no refresh credentials are set.
    pub access_token: String,
    /// OAuth2 refresh token.
    pub refresh_token: String,
    /// OAuth2 client id.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// OAuth2 token endpoint.
    pub token_uri: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GMAIL_API_BASE.to_string(),
            user_id: "me".to_string(),
            label: DEFAULT_FORWARD_LABEL.to_string(),
            access_token: String::new(),
            refresh_token: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        }
    }
}

impl GmailConfig {
    /// Whether refresh credentials are complete.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
            && !self.client_id.is_empty()
            && !self.client_secret.is_empty()
    }

    /// Whether any usable credential is configured.
    pub fn has_credentials(&self) -> bool {
        !self.access_token.is_empty() || self.can_refresh()
    }
}

// ─────────────────────────────────────────────
// LINE
// ─────────────────────────────────────────────

/// Chat sink settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineConfig {
    pub api_base: String,
    pub channel_access_token: String,
    /// Destination user/group/room id.
    pub to: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_LINE_API_BASE.to_string(),
            channel_access_token: String::new(),
            to: String::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Relay
// ─────────────────────────────────────────────

/// Run settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    /// Lookback window and default trigger interval, in minutes.
    pub interval_minutes: u32,
    /// Optional cron expression (seconds field first) overriding the interval trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 1,
            schedule: None,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
