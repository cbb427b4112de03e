//! g2l Cron — fires relay runs on a fixed interval or a cron expression.

pub mod service;
pub mod types;

pub use service::{IntervalTrigger, OnTickFn};
pub use types::TriggerSchedule;
