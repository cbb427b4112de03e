//! Adapter traits — the seams between the orchestrator and remote services.
//!
//! - `MailSource::list_candidates()` — search the mailbox for one time window
//! - `MailSource::fetch()` — retrieve and decode one message
//! - `MailSource::mark_read()` — clear the unread flag
//! - `ChatSink::push()` — deliver rendered payloads in a single call

use async_trait::async_trait;
use g2l_core::{MailRecord, SinkError, SourceError, TimeWindow};

/// A mailbox that can be searched, read and acknowledged.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Short name for logging (e.g. "gmail").
    fn name(&self) -> &str;

    /// Ids of unread, labelled messages received after `window.lower_bound()`.
    ///
    /// Order is whatever the service returns. An empty result is
    /// `SourceError::NoMatch`, not an empty vector.
    async fn list_candidates(&self, window: &TimeWindow) -> Result<Vec<String>, SourceError>;

    /// Retrieve one message and decode its headers and body.
    async fn fetch(&self, id: &str) -> Result<MailRecord, SourceError>;

    /// Clear the unread flag on one message.
    async fn mark_read(&self, id: &str) -> Result<(), SourceError>;
}

/// A chat service that accepts a batch of text messages for one destination.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Short name for logging (e.g. "line").
    fn name(&self) -> &str;

    /// Push every payload, in order, as one request. No chunking.
    async fn push(&self, destination: &str, payloads: &[String]) -> Result<(), SinkError>;
}
