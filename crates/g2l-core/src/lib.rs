//! g2l Core — shared types for the mail → chat relay.
//!
//! This crate provides:
//! - **types**: run-scoped value objects (`TimeWindow`, `MailRecord`, `MailPart`, `ForwardBatch`)
//! - **mime**: recursive body decoding over a `MailPart` tree
//! - **format**: the outbound text template
//! - **error**: the error taxonomy shared by adapters and the orchestrator
//! - **config**: JSON config schema, loader and env var overrides

pub mod config;
pub mod error;
pub mod format;
pub mod mime;
pub mod types;
pub mod utils;

pub use error::{ConfigError, DecodeError, RelayError, SinkError, SourceError, WindowError};
pub use format::render;
pub use types::{ForwardBatch, MailPart, MailRecord, TimeWindow};
