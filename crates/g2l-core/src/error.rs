//! Error taxonomy for a relay run.
//!
//! Only [`RelayError`] escapes the orchestrator; everything else is either an
//! expected outcome (`SourceError::NoMatch`) or recovered per item.

use chrono::Duration;

/// Errors raised by the mail source adapter.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The search returned nothing. Not a failure.
    #[error("no message found")]
    NoMatch,

    /// Query, auth or transport failure while listing candidates.
    #[error("unable to list messages: {0}")]
    List(String),

    /// The message could not be retrieved.
    #[error("unable to get message {id}: {reason}")]
    Fetch { id: String, reason: String },

    /// The message was retrieved but its body could not be decoded.
    #[error("unable to decode message {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: DecodeError,
    },

    /// Clearing the unread flag failed.
    #[error("failed to mark message {id} as read: {reason}")]
    Acknowledge { id: String, reason: String },
}

impl SourceError {
    /// Whether this is the expected empty-result outcome.
    pub fn is_no_match(&self) -> bool {
        matches!(self, SourceError::NoMatch)
    }
}

/// MIME body decoding failure.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("base64 decode error in {mime_type} part: {source}")]
    Base64 {
        mime_type: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// Errors raised by the chat sink adapter.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("push request failed: {0}")]
    Request(String),

    /// The API answered with a non-success status.
    #[error("push rejected: {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Nothing to push.
    #[error("push called with no messages")]
    Empty,
}

/// The two conditions that make a whole run fail.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("error listing messages: {0}")]
    List(#[source] SourceError),

    #[error("error forwarding messages: {0}")]
    Sink(#[from] SinkError),
}

/// Invalid time window.
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("lookback must not be negative (got {0})")]
    NegativeLookback(Duration),
}

/// Configuration problems detected by `Config::validate`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {key}. {hint}")]
    Missing { key: String, hint: String },

    #[error("invalid configuration value for {key}: {message}")]
    Invalid { key: String, message: String },
}
