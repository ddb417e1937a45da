//! Operator alerting side-channel.
//!
//! Two events go out: every received message (the ops log) and every
//! sender the resolver could not place. Alert delivery is best-effort;
//! a failed post is logged and never fails the pipeline run.

use serde_json::{Value, json};
use tracing::warn;

use crate::mail::ParsedMail;
use crate::notify::NotificationTransport;

/// Operator-facing event sink.
pub trait AlertSink {
    /// A message arrived and was parsed.
    fn message_received(&self, mail: &ParsedMail, read_link: &str)
    -> impl Future<Output = ()> + Send;

    /// No resolution strategy matched the sender. Carries enough
    /// detail to register the missing source by hand.
    fn unknown_sender(
        &self,
        mail: &ParsedMail,
        content_key: &str,
        read_link: &str,
    ) -> impl Future<Output = ()> + Send;
}

/// Alert sink posting block-style messages to two operator webhooks.
pub struct WebhookAlertSink<T> {
    transport: T,
    log_endpoint: Option<String>,
    unknown_endpoint: Option<String>,
}

impl<T: NotificationTransport + Sync> WebhookAlertSink<T> {
    /// Sink over `transport`; either endpoint may be absent, which
    /// silently disables that event.
    pub fn new(transport: T, log_endpoint: Option<String>, unknown_endpoint: Option<String>) -> Self {
        Self {
            transport,
            log_endpoint,
            unknown_endpoint,
        }
    }

    async fn post(&self, endpoint: Option<&str>, text: String) {
        let Some(endpoint) = endpoint else { return };
        let payload = blocks_payload(&text);
        if let Err(e) = self.transport.deliver(endpoint, &payload).await {
            warn!(error = %e, "alert delivery failed");
        }
    }
}

impl<T: NotificationTransport + Sync> AlertSink for WebhookAlertSink<T> {
    async fn message_received(&self, mail: &ParsedMail, read_link: &str) {
        let text = format!(
            "email : {}\nid : {}\n*<{}|{}>*",
            mail.sender_email.as_deref().unwrap_or("-"),
            mail.sender_name.as_deref().unwrap_or("-"),
            read_link,
            mail.subject.as_deref().unwrap_or("(제목 없음)"),
        );
        self.post(self.log_endpoint.as_deref(), text).await;
    }

    async fn unknown_sender(&self, mail: &ParsedMail, content_key: &str, read_link: &str) {
        let text = format!(
            "{}\nis unknown email address\n뉴스레터: {}\n제목: {}\n링크: {}\nCONTENT KEY: {}",
            mail.sender_email.as_deref().unwrap_or("-"),
            mail.sender_name.as_deref().unwrap_or("-"),
            mail.subject.as_deref().unwrap_or("(제목 없음)"),
            read_link,
            content_key,
        );
        self.post(self.unknown_endpoint.as_deref(), text).await;
    }
}

fn blocks_payload(text: &str) -> Value {
    json!({
        "blocks": [{
            "type": "section",
            "fields": [{ "type": "mrkdwn", "text": text }],
        }],
    })
}

/// Alert sink that drops every event. Used when no operator webhooks
/// are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    async fn message_received(&self, _mail: &ParsedMail, _read_link: &str) {}

    async fn unknown_sender(&self, _mail: &ParsedMail, _content_key: &str, _read_link: &str) {}
}
