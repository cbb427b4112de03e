//! g2l Channels — the two remote services the relay bridges.
//!
//! This crate provides:
//! - **base**: the `MailSource` and `ChatSink` traits the orchestrator drives
//! - **gmail**: `GmailSource` — Gmail REST API (search, get, modify)
//! - **line**: `LineSink` — LINE Messaging API push

pub mod base;
pub mod gmail;
pub mod line;

pub use base::{ChatSink, MailSource};
pub use gmail::GmailSource;
pub use line::LineSink;
