//! Relay — one list → fetch/acknowledge → push pass.
//!
//! Processing is strictly sequential: each candidate is fetched, appended to
//! the batch and acknowledged before the next one is touched. Acknowledgement
//! happens before the push, so a failed push leaves already-read messages
//! behind (at-least-once is not guaranteed).

use std::sync::Arc;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use tracing::{debug, error, info, warn};

use g2l_channels::{ChatSink, MailSource};
use g2l_core::config::Config;
use g2l_core::{ForwardBatch, RelayError, TimeWindow};

/// Settings for a relay run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelaySettings {
    /// Chat destination id.
    pub destination: String,
}

impl RelaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            destination: config.line.to.clone(),
        }
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Candidate ids returned by the listing call.
    pub listed: usize,
    /// Records pushed to the chat sink.
    pub forwarded: usize,
    /// Ids whose fetch or decode failed; these were skipped.
    pub fetch_failures: Vec<String>,
    /// Ids that were forwarded but could not be marked read.
    pub ack_failures: Vec<String>,
}

impl RunReport {
    /// Whether the run found nothing to do.
    pub fn is_idle(&self) -> bool {
        self.listed == 0
    }
}

/// The pipeline orchestrator.
pub struct Relay {
    source: Arc<dyn MailSource>,
    sink: Arc<dyn ChatSink>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(
        source: Arc<dyn MailSource>,
        sink: Arc<dyn ChatSink>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            source,
            sink,
            settings,
        }
    }

    /// Execute one run over `window`.
    ///
    /// The caller owns the window so that scheduled runs can reach back to
    /// the previous fire. Returns `Ok` when nothing matched, and when some or
    /// all items failed individually. Only a listing failure or a push
    /// failure is an error.
    pub async fn run(&self, window: &TimeWindow) -> Result<RunReport, RelayError> {
        debug!(
            source = self.source.name(),
            after = %window.lower_bound(),
            "starting relay run"
        );

        let ids = match self.source.list_candidates(window).await {
            Ok(ids) => ids,
            Err(e) if e.is_no_match() => {
                info!("no message found");
                return Ok(RunReport::default());
            }
            Err(e) => {
                error!(error = %e, "error listing messages");
                return Err(RelayError::List(e));
            }
        };

        let mut report = RunReport {
            listed: ids.len(),
            ..RunReport::default()
        };
        let mut batch = ForwardBatch::new();

        for id in &ids {
            let record = match self.source.fetch(id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(id = %id, error = %e, "skipping message");
                    report.fetch_failures.push(id.clone());
                    continue;
                }
            };
            batch.push(record);

            if let Err(e) = self.source.mark_read(id).await {
                warn!(id = %id, error = %e, "failed to mark message as read");
                report.ack_failures.push(id.clone());
            }
        }

        if batch.is_empty() {
            info!(listed = report.listed, "nothing to forward");
            return Ok(report);
        }

        let payloads = batch.render();
        if let Err(e) = self.sink.push(&self.settings.destination, &payloads).await {
            error!(sink = self.sink.name(), error = %e, "error forwarding messages");
            return Err(RelayError::Sink(e));
        }

        report.forwarded = payloads.len();
        info!(
            listed = report.listed,
            forwarded = report.forwarded,
            skipped = report.fetch_failures.len(),
            "relay run complete"
        );
        Ok(report)
    }
}

/// Truncate an instant to the whole minute.
///
/// Manual runs use this so the window lines up with scheduled fires.
pub fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::minutes(1))
        .unwrap_or(instant)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use g2l_core::{MailRecord, SinkError, SourceError};

    // ── Fakes ──

    #[derive(Clone)]
    enum ListOutcome {
        Ids(Vec<&'static str>),
        NoMatch,
        Fail,
    }

    struct FakeSource {
        list: ListOutcome,
        broken: HashSet<&'static str>,
        ack_broken: HashSet<&'static str>,
        seen_window: Mutex<Option<TimeWindow>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(list: ListOutcome) -> Self {
            Self {
                list,
                broken: HashSet::new(),
                ack_broken: HashSet::new(),
                seen_window: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_broken(mut self, ids: &[&'static str]) -> Self {
            self.broken.extend(ids);
            self
        }

        fn with_ack_broken(mut self, ids: &[&'static str]) -> Self {
            self.ack_broken.extend(ids);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn list_candidates(&self, window: &TimeWindow) -> Result<Vec<String>, SourceError> {
            *self.seen_window.lock().unwrap() = Some(*window);
            self.calls.lock().unwrap().push("list".into());
            match &self.list {
                ListOutcome::Ids(ids) => Ok(ids.iter().map(|s| s.to_string()).collect()),
                ListOutcome::NoMatch => Err(SourceError::NoMatch),
                ListOutcome::Fail => Err(SourceError::List("401 Unauthorized".into())),
            }
        }

        async fn fetch(&self, id: &str) -> Result<MailRecord, SourceError> {
            self.calls.lock().unwrap().push(format!("fetch:{id}"));
            if self.broken.contains(id) {
                return Err(SourceError::Fetch {
                    id: id.into(),
                    reason: "boom".into(),
                });
            }
            Ok(MailRecord::new(
                id,
                format!("{id}@example.com"),
                format!("Subject {id}"),
                format!("Body {id}"),
            ))
        }

        async fn mark_read(&self, id: &str) -> Result<(), SourceError> {
            self.calls.lock().unwrap().push(format!("ack:{id}"));
            if self.ack_broken.contains(id) {
                return Err(SourceError::Acknowledge {
                    id: id.into(),
                    reason: "403".into(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        fail: bool,
        pushes: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeSink {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn pushes(&self) -> Vec<(String, Vec<String>)> {
            self.pushes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatSink for FakeSink {
        fn name(&self) -> &str {
            "fake"
        }

        async fn push(&self, destination: &str, payloads: &[String]) -> Result<(), SinkError> {
            self.pushes
                .lock()
                .unwrap()
                .push((destination.to_string(), payloads.to_vec()));
            if self.fail {
                return Err(SinkError::Rejected {
                    status: 500,
                    body: "down".into(),
                });
            }
            Ok(())
        }
    }

    fn settings() -> RelaySettings {
        RelaySettings {
            destination: "U123".into(),
        }
    }

    fn trigger() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::from_minutes(trigger(), 5)
    }

    fn relay(source: &Arc<FakeSource>, sink: &Arc<FakeSink>) -> Relay {
        Relay::new(source.clone(), sink.clone(), settings())
    }

    fn expected_payload(id: &str) -> String {
        format!("[From]\n{id}@example.com\n[Subject]\nSubject {id}\n[Body]\nBody {id}\n")
    }

    // ── Runs ──

    #[tokio::test]
    async fn test_no_match_skips_sink() {
        let source = Arc::new(FakeSource::new(ListOutcome::NoMatch));
        let sink = Arc::new(FakeSink::default());

        let report = relay(&source, &sink).run(&window()).await.unwrap();

        assert!(report.is_idle());
        assert!(sink.pushes().is_empty());
        assert_eq!(source.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_window_is_passed_to_source() {
        let source = Arc::new(FakeSource::new(ListOutcome::NoMatch));
        let sink = Arc::new(FakeSink::default());

        relay(&source, &sink).run(&window()).await.unwrap();

        let window = source.seen_window.lock().unwrap().unwrap();
        assert_eq!(window.reference(), trigger());
        assert_eq!(
            window.lower_bound(),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 25, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_all_forwarded_in_one_push_in_order() {
        let source = Arc::new(FakeSource::new(ListOutcome::Ids(vec!["a", "b", "c"])));
        let sink = Arc::new(FakeSink::default());

        let report = relay(&source, &sink).run(&window()).await.unwrap();

        assert_eq!(report.listed, 3);
        assert_eq!(report.forwarded, 3);
        let pushes = sink.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, "U123");
        assert_eq!(
            pushes[0].1,
            vec![
                expected_payload("a"),
                expected_payload("b"),
                expected_payload("c")
            ]
        );
    }

    #[tokio::test]
    async fn test_ack_follows_each_fetch() {
        let source = Arc::new(FakeSource::new(ListOutcome::Ids(vec!["a", "b"])));
        let sink = Arc::new(FakeSink::default());

        relay(&source, &sink).run(&window()).await.unwrap();

        assert_eq!(
            source.calls(),
            vec!["list", "fetch:a", "ack:a", "fetch:b", "ack:b"]
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_is_skipped_and_not_acked() {
        let source = Arc::new(
            FakeSource::new(ListOutcome::Ids(vec!["a", "b", "c"])).with_broken(&["b"]),
        );
        let sink = Arc::new(FakeSink::default());

        let report = relay(&source, &sink).run(&window()).await.unwrap();

        assert_eq!(report.forwarded, 2);
        assert_eq!(report.fetch_failures, vec!["b".to_string()]);
        assert!(!source.calls().contains(&"ack:b".to_string()));
        assert_eq!(
            sink.pushes()[0].1,
            vec![expected_payload("a"), expected_payload("c")]
        );
    }

    #[tokio::test]
    async fn test_all_fetches_fail_means_no_push() {
        let source = Arc::new(
            FakeSource::new(ListOutcome::Ids(vec!["a", "b"])).with_broken(&["a", "b"]),
        );
        let sink = Arc::new(FakeSink::default());

        let report = relay(&source, &sink).run(&window()).await.unwrap();

        assert_eq!(report.listed, 2);
        assert_eq!(report.forwarded, 0);
        assert!(sink.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_ack_failure_keeps_record_in_batch() {
        let source = Arc::new(
            FakeSource::new(ListOutcome::Ids(vec!["a", "b"])).with_ack_broken(&["a"]),
        );
        let sink = Arc::new(FakeSink::default());

        let report = relay(&source, &sink).run(&window()).await.unwrap();

        assert_eq!(report.forwarded, 2);
        assert_eq!(report.ack_failures, vec!["a".to_string()]);
        assert_eq!(sink.pushes()[0].1.len(), 2);
    }

    #[tokio::test]
    async fn test_list_failure_is_fatal() {
        let source = Arc::new(FakeSource::new(ListOutcome::Fail));
        let sink = Arc::new(FakeSink::default());

        let err = relay(&source, &sink).run(&window()).await.unwrap_err();

        assert!(matches!(err, RelayError::List(_)));
        assert!(err.to_string().starts_with("error listing messages"));
        assert!(sink.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_fatal_after_acks() {
        let source = Arc::new(FakeSource::new(ListOutcome::Ids(vec!["a"])));
        let sink = Arc::new(FakeSink::failing());

        let err = relay(&source, &sink).run(&window()).await.unwrap_err();

        assert!(matches!(err, RelayError::Sink(_)));
        assert!(err.to_string().starts_with("error forwarding messages"));
        assert!(source.calls().contains(&"ack:a".to_string()));
    }

    #[tokio::test]
    async fn test_listed_empty_without_no_match() {
        let source = Arc::new(FakeSource::new(ListOutcome::Ids(vec![])));
        let sink = Arc::new(FakeSink::default());

        let report = relay(&source, &sink).run(&window()).await.unwrap();

        assert!(report.is_idle());
        assert!(sink.pushes().is_empty());
    }

    // ── Settings & helpers ──

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.line.to = "Cgroup".into();

        let settings = RelaySettings::from_config(&config);
        assert_eq!(settings.destination, "Cgroup");
    }

    #[test]
    fn test_truncate_to_minute() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 59).unwrap()
            + TimeDelta::milliseconds(750);
        assert_eq!(truncate_to_minute(instant), trigger());
        assert_eq!(truncate_to_minute(trigger()), trigger());
    }

    // ── Through the Gmail adapter ──

    mod gmail {
        use super::*;
        use base64::engine::general_purpose::URL_SAFE;
        use base64::Engine as _;
        use g2l_channels::GmailSource;
        use g2l_core::config::GmailConfig;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn message(id: &str, data: &str) -> serde_json::Value {
            serde_json::json!({
                "id": id,
                "payload": {
                    "mimeType": "multipart/alternative",
                    "headers": [
                        { "name": "From", "value": format!("{id}@example.com") },
                        { "name": "Subject", "value": format!("Subject {id}") }
                    ],
                    "parts": [
                        { "mimeType": "text/plain", "body": { "data": data } }
                    ]
                }
            })
        }

        async fn mount_message(server: &MockServer, id: &str, data: &str, acks: u64) {
            Mock::given(method("GET"))
                .and(path(format!("/gmail/v1/users/me/messages/{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(message(id, data)))
                .expect(1)
                .mount(server)
                .await;
            Mock::given(method("POST"))
                .and(path(format!("/gmail/v1/users/me/messages/{id}/modify")))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
                .expect(acks)
                .mount(server)
                .await;
        }

        #[tokio::test]
        async fn test_malformed_body_fails_only_its_message() {
            let server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/gmail/v1/users/me/messages"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "messages": [{ "id": "a" }, { "id": "b" }, { "id": "c" }]
                })))
                .mount(&server)
                .await;
            mount_message(&server, "a", &URL_SAFE.encode("Body a"), 1).await;
            mount_message(&server, "b", "!!not base64!!", 0).await;
            mount_message(&server, "c", &URL_SAFE.encode("Body c"), 1).await;

            let source = Arc::new(GmailSource::new(GmailConfig {
                api_base: server.uri(),
                access_token: "test-token".into(),
                ..GmailConfig::default()
            }));
            let sink = Arc::new(FakeSink::default());
            let relay = Relay::new(source, sink.clone(), settings());

            let report = relay.run(&window()).await.unwrap();

            assert_eq!(report.listed, 3);
            assert_eq!(report.forwarded, 2);
            assert_eq!(report.fetch_failures, vec!["b".to_string()]);
            assert!(report.ack_failures.is_empty());

            let pushes = sink.pushes();
            assert_eq!(pushes.len(), 1);
            assert_eq!(
                pushes[0].1,
                vec![expected_payload("a"), expected_payload("c")]
            );
        }
    }
}
