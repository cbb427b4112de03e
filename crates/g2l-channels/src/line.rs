//! LINE sink — Messaging API push.
//!
//! `POST {apiBase}/v2/bot/message/push` with a bearer channel access token and
//! `{"to": "...", "messages": [{"type": "text", "text": "..."}]}`.
//!
//! The API caps the number of messages per push; a batch over the cap is
//! rejected by the server and surfaces as `SinkError::Rejected`.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use g2l_core::config::LineConfig;
use g2l_core::utils::truncate_string;
use g2l_core::SinkError;

use crate::base::ChatSink;

/// Max characters of an error body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// LINE Messaging API client.
pub struct LineSink {
    client: reqwest::Client,
    api_base: String,
    channel_access_token: String,
}

impl std::fmt::Debug for LineSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSink")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl LineSink {
    pub fn new(config: &LineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            channel_access_token: config.channel_access_token.clone(),
        }
    }

    fn push_url(&self) -> String {
        format!("{}/v2/bot/message/push", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatSink for LineSink {
    fn name(&self) -> &str {
        "line"
    }

    async fn push(&self, destination: &str, payloads: &[String]) -> Result<(), SinkError> {
        if payloads.is_empty() {
            return Err(SinkError::Empty);
        }

        let request = PushRequest {
            to: destination,
            messages: payloads
                .iter()
                .map(|text| TextMessage {
                    kind: "text",
                    text: text.as_str(),
                })
                .collect(),
        };

        debug!(to = %destination, messages = payloads.len(), "pushing to LINE");

        let response = self
            .client
            .post(self.push_url())
            .bearer_auth(&self.channel_access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body: truncate_string(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        info!(to = %destination, messages = payloads.len(), "pushed to LINE");
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_sink(api_base: &str) -> LineSink {
        LineSink::new(&LineConfig {
            api_base: api_base.to_string(),
            channel_access_token: "line-token".to_string(),
            to: "U123".to_string(),
        })
    }

    #[test]
    fn test_push_url_trailing_slash() {
        let sink = make_sink("https://api.line.me/");
        assert_eq!(sink.push_url(), "https://api.line.me/v2/bot/message/push");
    }

    #[test]
    fn test_name() {
        assert_eq!(make_sink("https://api.line.me").name(), "line");
    }

    #[tokio::test]
    async fn test_push_sends_all_messages_in_order() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .and(header("Authorization", "Bearer line-token"))
            .and(body_json(serde_json::json!({
                "to": "U123",
                "messages": [
                    { "type": "text", "text": "first" },
                    { "type": "text", "text": "second" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sink = make_sink(&mock_server.uri());
        sink.push("U123", &["first".to_string(), "second".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_push_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "Size must be between 1 and 5"
            })))
            .mount(&mock_server)
            .await;

        let sink = make_sink(&mock_server.uri());
        let payloads: Vec<String> = (0..6).map(|i| format!("msg {i}")).collect();
        let err = sink.push("U123", &payloads).await.unwrap_err();
        match err {
            SinkError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("Size must be between 1 and 5"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_push_network_error() {
        let sink = make_sink("http://127.0.0.1:1");
        let err = sink.push("U123", &["hi".to_string()]).await.unwrap_err();
        assert!(matches!(err, SinkError::Request(_)));
    }

    #[tokio::test]
    async fn test_push_empty_batch() {
        let sink = make_sink("http://127.0.0.1:1");
        let err = sink.push("U123", &[]).await.unwrap_err();
        assert!(matches!(err, SinkError::Empty));
    }
}
