//! Core types for g2l — the value objects that flow through one relay run.
//!
//! Everything here is run-scoped: a `TimeWindow` is built from the trigger
//! instant, records are decoded from the mailbox, rendered into a
//! `ForwardBatch`, pushed, and dropped. Nothing is persisted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WindowError;

// ─────────────────────────────────────────────
// TimeWindow
// ─────────────────────────────────────────────

/// Trailing interval ending at the reference instant.
///
/// Mail received after `reference - lookback` is eligible for forwarding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    reference: DateTime<Utc>,
    lookback: Duration,
}

impl TimeWindow {
    /// Create a window ending at `reference`. Rejects a negative lookback.
    pub fn new(reference: DateTime<Utc>, lookback: Duration) -> Result<Self, WindowError> {
        if lookback < Duration::zero() {
            return Err(WindowError::NegativeLookback(lookback));
        }
        Ok(Self {
            reference,
            lookback,
        })
    }

    /// Create a window from a lookback expressed in whole minutes.
    pub fn from_minutes(reference: DateTime<Utc>, minutes: u32) -> Self {
        Self {
            reference,
            lookback: Duration::minutes(i64::from(minutes)),
        }
    }

    /// The instant the window ends at ("now" for the run).
    pub fn reference(&self) -> DateTime<Utc> {
        self.reference
    }

    /// Length of the window.
    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    /// Effective lower bound: `reference - lookback`.
    pub fn lower_bound(&self) -> DateTime<Utc> {
        self.reference - self.lookback
    }
}

// ─────────────────────────────────────────────
// MailRecord
// ─────────────────────────────────────────────

/// One decoded mailbox message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRecord {
    /// Opaque remote message id.
    pub id: String,
    /// Raw `From` header value.
    pub from: String,
    /// Raw `Subject` header value.
    pub subject: String,
    /// Concatenated plain-text body.
    pub body: String,
}

impl MailRecord {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

// ─────────────────────────────────────────────
// MailPart
// ─────────────────────────────────────────────

/// One node of a message's MIME tree.
///
/// `data` holds the still-encoded (base64url) payload as delivered by the
/// mailbox; decoding happens in [`crate::mime::decode_body`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MailPart {
    pub mime_type: String,
    pub data: Option<String>,
    pub children: Vec<MailPart>,
}

impl MailPart {
    /// A leaf part carrying an encoded payload.
    pub fn leaf(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: Some(data.into()),
            children: Vec::new(),
        }
    }

    /// A composite part (e.g. `multipart/alternative`).
    pub fn composite(mime_type: impl Into<String>, children: Vec<MailPart>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: None,
            children,
        }
    }
}

// ─────────────────────────────────────────────
// ForwardBatch
// ─────────────────────────────────────────────

/// Records collected in one run, in the order they were fetched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardBatch {
    records: Vec<MailRecord>,
}

impl ForwardBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: MailRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MailRecord] {
        &self.records
    }

    /// Render every record into its outbound payload, preserving order.
    pub fn render(&self) -> Vec<String> {
        self.records.iter().map(crate::format::render).collect()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
