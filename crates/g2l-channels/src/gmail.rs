//! Gmail source — REST API search, fetch and unread-flag removal.
//!
//! Endpoints used (relative to `apiBase`):
//! - `GET  /gmail/v1/users/{user}/messages?q=...&fields=messages/id`
//! - `GET  /gmail/v1/users/{user}/messages/{id}`
//! - `POST /gmail/v1/users/{user}/messages/{id}/modify`
//!
//! When refresh credentials are configured, a fresh access token is obtained
//! from the OAuth2 token endpoint before each listing call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use g2l_core::config::GmailConfig;
use g2l_core::mime::decode_body;
use g2l_core::utils::truncate_string;
use g2l_core::{MailPart, MailRecord, SourceError, TimeWindow};

use crate::base::MailSource;

// ─────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────

/// Only message ids are needed from the search call.
const LIST_FIELDS: &str = "messages/id";

/// System label that marks a message unread.
const UNREAD_LABEL: &str = "UNREAD";

/// Max characters of an error body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 300;

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListMessagesResponse {
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(default)]
    payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MessagePart {
    mime_type: String,
    headers: Vec<MessageHeader>,
    body: Option<MessagePartBody>,
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct MessageHeader {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessagePartBody {
    /// Base64url-encoded payload.
    data: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyMessageRequest<'a> {
    remove_label_ids: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl From<MessagePart> for MailPart {
    fn from(part: MessagePart) -> Self {
        MailPart {
            mime_type: part.mime_type,
            data: part.body.and_then(|b| b.data),
            children: part.parts.into_iter().map(MailPart::from).collect(),
        }
    }
}

// ─────────────────────────────────────────────
// Header / query helpers
// ─────────────────────────────────────────────

/// Build the search query for a window.
///
/// The lower bound is sent as Unix seconds.
pub fn build_query(label: &str, window: &TimeWindow) -> String {
    format!(
        "is:unread label:{} after:{}",
        label,
        window.lower_bound().timestamp()
    )
}

/// First value of a header, or "" when absent.
fn header_value(headers: &[MessageHeader], name: &str) -> String {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
        .unwrap_or_default()
}

/// Turn a fetched message into a record.
fn into_record(message: GmailMessage) -> Result<MailRecord, SourceError> {
    let part = message.payload.unwrap_or_default();
    let from = header_value(&part.headers, "From");
    let subject = header_value(&part.headers, "Subject");

    let tree = MailPart::from(part);
    let body = decode_body(&tree).map_err(|source| SourceError::Decode {
        id: message.id.clone(),
        source,
    })?;

    Ok(MailRecord {
        id: message.id,
        from,
        subject,
        body,
    })
}

// ─────────────────────────────────────────────
// GmailSource
// ─────────────────────────────────────────────

/// Gmail REST API mailbox.
pub struct GmailSource {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    config: GmailConfig,
    /// Current bearer token; replaced on refresh.
    access_token: RwLock<String>,
}

impl std::fmt::Debug for GmailSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailSource")
            .field("api_base", &self.config.api_base)
            .field("user_id", &self.config.user_id)
            .field("label", &self.config.label)
            .finish()
    }
}

impl GmailSource {
    pub fn new(config: GmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: RwLock::new(config.access_token.clone()),
            config,
        }
    }

    /// `{apiBase}/gmail/v1/users/{user}/messages`
    fn messages_url(&self) -> String {
        format!(
            "{}/gmail/v1/users/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.user_id
        )
    }

    fn message_url(&self, id: &str) -> String {
        format!("{}/{}", self.messages_url(), id)
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh_access_token(&self) -> Result<(), String> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.config.refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| format!("token request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!(
                "token endpoint returned {}: {}",
                status,
                truncate_string(&body, MAX_ERROR_BODY_CHARS)
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid token response: {e}"))?;

        *self.access_token.write().await = token.access_token;
        debug!("refreshed Gmail access token");
        Ok(())
    }

    async fn bearer(&self) -> String {
        self.access_token.read().await.clone()
    }
}

#[async_trait]
impl MailSource for GmailSource {
    fn name(&self) -> &str {
        "gmail"
    }

    async fn list_candidates(&self, window: &TimeWindow) -> Result<Vec<String>, SourceError> {
        if self.config.can_refresh() {
            self.refresh_access_token().await.map_err(SourceError::List)?;
        }

        let query = build_query(&self.config.label, window);
        debug!(query = %query, "searching mailbox");

        let response = self
            .client
            .get(self.messages_url())
            .bearer_auth(self.bearer().await)
            .query(&[("q", query.as_str()), ("fields", LIST_FIELDS)])
            .send()
            .await
            .map_err(|e| SourceError::List(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::List(format!(
                "{}: {}",
                status,
                truncate_string(&body, MAX_ERROR_BODY_CHARS)
            )));
        }

        let list: ListMessagesResponse = response
            .json()
            .await
            .map_err(|e| SourceError::List(format!("invalid list response: {e}")))?;

        if list.messages.is_empty() {
            return Err(SourceError::NoMatch);
        }

        info!(count = list.messages.len(), "found messages to forward");
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch(&self, id: &str) -> Result<MailRecord, SourceError> {
        let fetch_err = |reason: String| SourceError::Fetch {
            id: id.to_string(),
            reason,
        };

        let response = self
            .client
            .get(self.message_url(id))
            .bearer_auth(self.bearer().await)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_err(format!(
                "{}: {}",
                status,
                truncate_string(&body, MAX_ERROR_BODY_CHARS)
            )));
        }

        let message: GmailMessage = response
            .json()
            .await
            .map_err(|e| fetch_err(format!("invalid message response: {e}")))?;

        into_record(message)
    }

    async fn mark_read(&self, id: &str) -> Result<(), SourceError> {
        let ack_err = |reason: String| SourceError::Acknowledge {
            id: id.to_string(),
            reason,
        };

        let response = self
            .client
            .post(format!("{}/modify", self.message_url(id)))
            .bearer_auth(self.bearer().await)
            .json(&ModifyMessageRequest {
                remove_label_ids: [UNREAD_LABEL],
            })
            .send()
            .await
            .map_err(|e| ack_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ack_err(format!(
                "{}: {}",
                status,
                truncate_string(&body, MAX_ERROR_BODY_CHARS)
            )));
        }

        debug!(id = %id, "removed UNREAD label");
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
