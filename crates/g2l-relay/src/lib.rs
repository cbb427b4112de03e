//! g2l Relay — the pipeline orchestrator.
//!
//! One `Relay::run` is one pass: compute the window, list candidates, fetch
//! and acknowledge each in order, then push the rendered batch once.

pub mod relay;

pub use relay::{truncate_to_minute, Relay, RelaySettings, RunReport};
