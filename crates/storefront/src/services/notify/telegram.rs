//! Telegram Bot API sink.
//!
//! Sends the HTML-escaped order summary to every active recipient chat via
//! `POST {api_base}/bot{token}/sendMessage`. Recipients are sent to
//! concurrently, each request with its own timeout, so one unreachable chat
//! cannot hold up the rest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{DeliveryReport, NotificationError, NotificationSink};
use crate::config::TelegramConfig;
use crate::db::RecipientDirectory;

/// Per-request timeout for Bot API calls. Shorter than the default checkout
/// notification budget.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API client delivering to registered recipients.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
    request_timeout: Duration,
    recipients: Arc<dyn RecipientDirectory>,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(
        config: &TelegramConfig,
        recipients: Arc<dyn RecipientDirectory>,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            api_base: config.api_base.as_str().trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
            request_timeout: REQUEST_TIMEOUT,
            recipients,
        })
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn send_to(&self, chat_id: i64, text: &str) -> Result<(), NotificationError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        );
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Timeout
                } else {
                    // Strip the URL; it contains the bot token.
                    NotificationError::Request(e.without_url())
                }
            })?;

        let status = response.status();
        let parsed: Option<ApiResponse> = response.json().await.ok();

        match parsed {
            Some(api) if status.is_success() && api.ok => Ok(()),
            other => Err(NotificationError::Api {
                status: status.as_u16(),
                message: other
                    .and_then(|api| api.description)
                    .unwrap_or_else(|| "unexpected response".to_owned()),
            }),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    #[tracing::instrument(skip_all)]
    async fn send(&self, message: &str) -> Result<DeliveryReport, NotificationError> {
        let recipients = self.recipients.active_recipients().await?;
        if recipients.is_empty() {
            return Err(NotificationError::NotConfigured(
                "no active recipients".to_owned(),
            ));
        }

        let text = escape_html(message);
        let outcomes = join_all(
            recipients
                .iter()
                .map(|recipient| self.send_to(recipient.chat_id, &text)),
        )
        .await;

        let mut report = DeliveryReport::default();
        let mut last_error = None;
        for (recipient, outcome) in recipients.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        recipient = %recipient.name,
                        chat_id = recipient.chat_id,
                        error = %e,
                        "Telegram delivery failed"
                    );
                    report.failed += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if report.delivered == 0 => Err(e),
            _ => Ok(report),
        }
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use axum::{Json, Router, extract::State, routing::post};
    use url::Url;

    use super::*;
    use crate::db::InMemoryRecipients;

    type Seen = Arc<Mutex<Vec<serde_json::Value>>>;

    /// Fake Bot API: chat 13 is rejected, chat 15 never answers, everything
    /// else accepted.
    async fn spawn_bot_api() -> (Url, Seen) {
        async fn send_message(
            State(seen): State<Seen>,
            Json(body): Json<serde_json::Value>,
        ) -> Json<serde_json::Value> {
            let rejected = body["chat_id"] == 13;
            let stalled = body["chat_id"] == 15;
            seen.lock().unwrap().push(body);
            if stalled {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if rejected {
                Json(serde_json::json!({ "ok": false, "description": "chat not found" }))
            } else {
                Json(serde_json::json!({ "ok": true }))
            }
        }

        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/bottest-token/sendMessage", post(send_message))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        (Url::parse(&format!("http://{addr}/")).unwrap(), seen)
    }

    fn notifier(api_base: Url, recipients: InMemoryRecipients) -> TelegramNotifier {
        let config = TelegramConfig {
            bot_token: SecretString::from("test-token"),
            api_base,
        };
        TelegramNotifier::new(&config, Arc::new(recipients)).unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("Bolts <M8> & nuts"), "Bolts &lt;M8&gt; &amp; nuts");
    }

    #[tokio::test]
    async fn test_sends_to_every_active_recipient() {
        let (api_base, seen) = spawn_bot_api().await;
        let recipients = InMemoryRecipients::new();
        recipients.add("Manager", 11).await.unwrap();
        recipients.add("Owner", 12).await.unwrap();
        recipients.add("Former", 14).await.unwrap();
        recipients.deactivate(14).await.unwrap();

        let report = notifier(api_base, recipients)
            .send("New order #1 <x>")
            .await
            .unwrap();

        assert_eq!(report, DeliveryReport { delivered: 2, failed: 0 });
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0]["parse_mode"], "HTML");
        assert_eq!(seen[0]["text"], "New order #1 &lt;x&gt;");
    }

    #[tokio::test]
    async fn test_partial_failure_still_succeeds() {
        let (api_base, _seen) = spawn_bot_api().await;
        let recipients = InMemoryRecipients::new();
        recipients.add("Manager", 11).await.unwrap();
        recipients.add("Broken", 13).await.unwrap();

        let report = notifier(api_base, recipients).send("hi").await.unwrap();
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_stalled_chat_does_not_block_others() {
        let (api_base, seen) = spawn_bot_api().await;
        let recipients = InMemoryRecipients::new();
        recipients.add("Unreachable", 15).await.unwrap();
        recipients.add("Manager", 11).await.unwrap();

        let notifier =
            notifier(api_base, recipients).with_request_timeout(Duration::from_millis(200));
        let report = tokio::time::timeout(Duration::from_secs(2), notifier.send("hi"))
            .await
            .expect("send finishes within the per-request timeout")
            .unwrap();

        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|body| body["chat_id"] == 11));
    }

    #[tokio::test]
    async fn test_all_failed_is_error() {
        let (api_base, _seen) = spawn_bot_api().await;
        let recipients = InMemoryRecipients::new();
        recipients.add("Broken", 13).await.unwrap();

        let err = notifier(api_base, recipients).send("hi").await.unwrap_err();
        assert!(matches!(err, NotificationError::Api { .. }));
    }

    #[tokio::test]
    async fn test_no_recipients_is_not_configured() {
        let api_base = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = notifier(api_base, InMemoryRecipients::new())
            .send("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::NotConfigured(_)));
    }
}
