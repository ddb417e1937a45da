//! Notification fan-out over webhook transports.

use std::collections::HashSet;

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::Result;
use crate::channel::DeliveryChannel;
use crate::mail::MailRecord;
use crate::source::NewsletterSource;

/// Posts one formatted payload to one endpoint.
///
/// Callers treat delivery as fire-and-forget; a failed delivery is
/// logged, never retried.
pub trait NotificationTransport {
    /// Deliver `payload` to `endpoint`.
    fn deliver(&self, endpoint: &str, payload: &Value) -> impl Future<Output = Result<()>> + Send;
}

/// Transport posting JSON bodies over HTTP.
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    /// Transport with a fresh HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationTransport for WebhookTransport {
    async fn deliver(&self, endpoint: &str, payload: &Value) -> Result<()> {
        self.client
            .post(endpoint)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Builds the block-style notification body for one channel.
///
/// A header section announces the issue with a tracked read link;
/// every summary entry follows as its own section.
#[must_use]
pub fn notification_payload(
    record: &MailRecord,
    source: &NewsletterSource,
    channel: &DeliveryChannel,
    read_link_base: &str,
) -> Value {
    let link = format!(
        "{}&utm_source=slack&utm_medium=bot&utm_campaign={}",
        record.read_link(read_link_base),
        channel.tenant_label
    );
    let subject = record.subject.as_deref().unwrap_or("(제목 없음)");

    let mut blocks = vec![json!({
        "type": "section",
        "fields": [{
            "type": "mrkdwn",
            "text": format!("{}의 새로운 소식이 도착했어요.\n*<{link}|{subject}>*", source.name),
        }],
    })];

    for (title, content) in record.summary.iter() {
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*{title}*\n{content}"),
            },
        }));
    }

    json!({ "blocks": blocks })
}

/// Delivers one notification per distinct channel external id.
///
/// Channels are walked in listing order; the first channel seen for an
/// external id resolves the endpoint and later duplicates are skipped,
/// so a shared physical destination never hears about the same issue
/// twice. A failed delivery is logged and the walk continues.
///
/// Returns the number of successful deliveries.
pub async fn fan_out<T: NotificationTransport>(
    transport: &T,
    record: &MailRecord,
    source: &NewsletterSource,
    channels: &[DeliveryChannel],
    read_link_base: &str,
) -> usize {
    let mut notified: HashSet<&str> = HashSet::new();
    let mut delivered = 0;

    for channel in channels {
        if !notified.insert(channel.external_id.as_str()) {
            continue;
        }

        let payload = notification_payload(record, source, channel, read_link_base);
        match transport.deliver(&channel.endpoint, &payload).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(
                    external_id = %channel.external_id,
                    endpoint = %channel.endpoint,
                    error = %e,
                    "notification delivery failed",
                );
            }
        }
    }

    info!(
        newsletter_id = source.id,
        content_key = %record.content_key,
        delivered,
        total = channels.len(),
        "fan-out complete",
    );
    delivered
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::mail::Summary;
    use crate::source::{OperatingStatus, SourceLanguage};
    use chrono::Utc;
    use indexmap::IndexMap;
    use std::sync::Mutex;

    /// Transport that records deliveries and fails on demand.
    #[derive(Default)]
    struct RecordingTransport {
        delivered: Mutex<Vec<(String, Value)>>,
        fail_endpoints: Vec<String>,
    }

    impl NotificationTransport for RecordingTransport {
        async fn deliver(&self, endpoint: &str, payload: &Value) -> Result<()> {
            if self.fail_endpoints.iter().any(|f| f == endpoint) {
                return Err(Error::Oracle("delivery refused".to_string()));
            }
            self.delivered
                .lock()
                .unwrap()
                .push((endpoint.to_string(), payload.clone()));
            Ok(())
        }
    }

    fn record() -> MailRecord {
        let mut entries = IndexMap::new();
        entries.insert("첫 소식".to_string(), "요약 하나".to_string());
        entries.insert("둘째 소식".to_string(), "요약 둘".to_string());
        MailRecord {
            id: Some(1),
            content_key: "inbox/msg-1".to_string(),
            subject: Some("This week".to_string()),
            summary: Summary::new(entries),
            translated_body: None,
            newsletter_id: 7,
            received_at: Utc::now(),
        }
    }

    fn source() -> NewsletterSource {
        NewsletterSource {
            id: 7,
            name: "Acme Weekly".to_string(),
            language: SourceLanguage::Korean,
            email_addresses: vec!["news@acme.io".to_string()],
            operating_status: OperatingStatus::Active,
            last_received_at: None,
        }
    }

    fn channel(external_id: &str, endpoint: &str) -> DeliveryChannel {
        DeliveryChannel {
            id: None,
            user_id: 1,
            external_id: external_id.to_string(),
            endpoint: endpoint.to_string(),
            tenant_label: "acme".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_external_id_delivered_once_first_wins() {
        let transport = RecordingTransport::default();
        let channels = vec![
            channel("C1", "https://hooks.example/first"),
            channel("C1", "https://hooks.example/second"),
            channel("C2", "https://hooks.example/other"),
        ];

        let delivered = fan_out(
            &transport,
            &record(),
            &source(),
            &channels,
            "https://mail.press",
        )
        .await;

        assert_eq!(delivered, 2);
        let sent = transport.delivered.lock().unwrap();
        let endpoints: Vec<_> = sent.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(
            endpoints,
            vec!["https://hooks.example/first", "https://hooks.example/other"]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_channels() {
        let transport = RecordingTransport {
            fail_endpoints: vec!["https://hooks.example/bad".to_string()],
            ..Default::default()
        };
        let channels = vec![
            channel("C1", "https://hooks.example/bad"),
            channel("C2", "https://hooks.example/good"),
        ];

        let delivered = fan_out(
            &transport,
            &record(),
            &source(),
            &channels,
            "https://mail.press",
        )
        .await;

        assert_eq!(delivered, 1);
        let sent = transport.delivered.lock().unwrap();
        assert_eq!(sent[0].0, "https://hooks.example/good");
    }

    #[test]
    fn test_payload_shape() {
        let payload = notification_payload(
            &record(),
            &source(),
            &channel("C1", "https://hooks.example/1"),
            "https://mail.press",
        );

        let blocks = payload["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 3);

        let header = blocks[0]["fields"][0]["text"].as_str().unwrap();
        assert!(header.contains("Acme Weekly"));
        assert!(header.contains("https://mail.press/read?mail=inbox/msg-1"));
        assert!(header.contains("utm_campaign=acme"));
        assert!(header.contains("This week"));

        let first = blocks[1]["text"]["text"].as_str().unwrap();
        assert!(first.contains("첫 소식"));
        assert!(first.contains("요약 하나"));
    }
}
