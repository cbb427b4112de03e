//! Interval trigger — sleeps until the next fire instant, then invokes the
//! tick callback with the window ending at that instant.
//!
//! Windows are anchored on fire instants (not wake-up times) and reach back
//! to the previous fire, so consecutive runs cover back-to-back windows.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use g2l_core::TimeWindow;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::types::TriggerSchedule;

// ─────────────────────────────────────────────
// Callback type
// ─────────────────────────────────────────────

/// Callback invoked on each fire with the window to relay.
pub type OnTickFn = Arc<
    dyn Fn(TimeWindow) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send
        + Sync,
>;

// ─────────────────────────────────────────────
// IntervalTrigger
// ─────────────────────────────────────────────

pub struct IntervalTrigger {
    schedule: TriggerSchedule,
    on_tick: Option<OnTickFn>,
    /// Set once `stop()` is called; checked between runs.
    stopped: AtomicBool,
    /// Wakes the loop while it sleeps.
    shutdown: Notify,
}

impl IntervalTrigger {
    pub fn new(schedule: TriggerSchedule, on_tick: Option<OnTickFn>) -> Self {
        Self {
            schedule,
            on_tick,
            stopped: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn schedule(&self) -> &TriggerSchedule {
        &self.schedule
    }

    /// Run the trigger loop until `stop()` is called.
    ///
    /// Runs never overlap: the next fire is computed only after the current
    /// callback returns, so a slow run skips fires rather than queueing them.
    /// A run in progress when `stop()` is called completes before the loop exits.
    pub async fn start(&self) -> anyhow::Result<()> {
        info!(schedule = %self.schedule.describe(), "trigger started");

        loop {
            if self.stopped.load(Ordering::SeqCst) {
                info!("trigger shutting down");
                return Ok(());
            }

            let now = Utc::now();
            let Some(next) = self.schedule.next_fire_after(now) else {
                warn!("schedule has no upcoming fire, parking until shutdown");
                self.shutdown.notified().await;
                return Ok(());
            };

            let sleep_duration = (next - now).to_std().unwrap_or_default();
            debug!(next = %next, sleep_ms = sleep_duration.as_millis() as u64, "trigger armed");

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.fire(next).await;
                }
                _ = self.shutdown.notified() => {
                    info!("trigger shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Stop the trigger loop.
    ///
    /// Safe to call while a run is in progress: the flag is seen once the run
    /// returns, and the stored permit wakes a loop that is already sleeping.
    pub fn stop(&self) {
        info!("stopping trigger");
        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// Invoke the callback once for `at`, outside the schedule.
    ///
    /// The window reaches back to the schedule's previous fire before `at`.
    pub async fn trigger_now(&self, at: DateTime<Utc>) -> anyhow::Result<()> {
        let Some(window) = self.schedule.window_at(at) else {
            anyhow::bail!("schedule has no fire before {at}");
        };
        match &self.on_tick {
            Some(callback) => callback(window).await,
            None => {
                debug!("trigger has no callback");
                Ok(())
            }
        }
    }

    async fn fire(&self, at: DateTime<Utc>) {
        debug!(at = %at, "trigger fired");
        if let Err(e) = self.trigger_now(at).await {
            error!(at = %at, error = %e, "scheduled run failed");
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    fn recording_callback() -> (OnTickFn, Arc<Mutex<Vec<TimeWindow>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: OnTickFn = Arc::new(move |window| {
            let sink = sink.clone();
            Box::pin(async move {
                sink.lock().unwrap().push(window);
                Ok(())
            })
        });
        (callback, seen)
    }

    #[tokio::test]
    async fn test_trigger_now_passes_window() {
        let (callback, seen) = recording_callback();
        let trigger = IntervalTrigger::new(TriggerSchedule::Every(5), Some(callback));
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        trigger.trigger_now(at).await.unwrap();

        let windows = seen.lock().unwrap().clone();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].reference(), at);
        assert_eq!(windows[0].lookback(), Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_trigger_now_cron_window_reaches_previous_fire() {
        let (callback, seen) = recording_callback();
        let schedule = TriggerSchedule::cron("0 */15 * * * *").unwrap();
        let trigger = IntervalTrigger::new(schedule, Some(callback));
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        trigger.trigger_now(at).await.unwrap();

        let window = seen.lock().unwrap()[0];
        assert_eq!(
            window.lower_bound(),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 15, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_trigger_now_without_callback() {
        let trigger = IntervalTrigger::new(TriggerSchedule::Every(1), None);
        assert!(trigger.trigger_now(Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_trigger_now_propagates_error() {
        let callback: OnTickFn =
            Arc::new(|_| Box::pin(async { Err(anyhow::anyhow!("sink down")) }));
        let trigger = IntervalTrigger::new(TriggerSchedule::Every(1), Some(callback));

        let err = trigger.trigger_now(Utc::now()).await.unwrap_err();
        assert!(err.to_string().contains("sink down"));
    }

    #[tokio::test]
    async fn test_stop_exits_loop() {
        let trigger = Arc::new(IntervalTrigger::new(TriggerSchedule::Every(60), None));

        let t = trigger.clone();
        let handle = tokio::spawn(async move { t.start().await });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        trigger.stop();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_stop_before_start_returns_immediately() {
        let trigger = IntervalTrigger::new(TriggerSchedule::Every(60), None);
        trigger.stop();

        let result =
            tokio::time::timeout(std::time::Duration::from_secs(1), trigger.start()).await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_stop_during_run_is_honoured() {
        let runs = Arc::new(Mutex::new(0usize));
        let counter = runs.clone();
        let callback: OnTickFn = Arc::new(move |_| {
            let counter = counter.clone();
            Box::pin(async move {
                tokio::time::sleep(std::time::Duration::from_millis(600)).await;
                *counter.lock().unwrap() += 1;
                Ok(())
            })
        });
        let schedule = TriggerSchedule::cron("* * * * * *").unwrap();
        let trigger = Arc::new(IntervalTrigger::new(schedule, Some(callback)));

        let t = trigger.clone();
        let handle = tokio::spawn(async move { t.start().await });

        // Lands inside the first run (fire within 1s, then 600ms of work).
        tokio::time::sleep(std::time::Duration::from_millis(1300)).await;
        trigger.stop();

        let result = tokio::time::timeout(std::time::Duration::from_secs(4), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))), "loop kept running after stop");
        assert!(*runs.lock().unwrap() <= 2);
    }

    #[tokio::test]
    async fn test_loop_fires_on_whole_seconds() {
        let (callback, seen) = recording_callback();
        let schedule = TriggerSchedule::cron("* * * * * *").unwrap();
        let trigger = Arc::new(IntervalTrigger::new(schedule, Some(callback)));

        let t = trigger.clone();
        let handle = tokio::spawn(async move { t.start().await });

        tokio::time::sleep(std::time::Duration::from_millis(2200)).await;
        trigger.stop();
        handle.await.unwrap().unwrap();

        let fired = seen.lock().unwrap().clone();
        assert!(!fired.is_empty());
        for window in &fired {
            assert_eq!(window.reference().timestamp_subsec_nanos(), 0);
            assert_eq!(window.lookback(), Duration::seconds(1));
        }
    }
}
