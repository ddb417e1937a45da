//! Mail data models.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use mailpress_mime::Message;
use serde::{Deserialize, Serialize};

/// Structured fields of one incoming message.
///
/// Derived deterministically from the raw blob and never mutated
/// afterwards. Every field is optional: parsing degrades on malformed
/// input instead of aborting the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ParsedMail {
    /// Sender display name, or the whole raw From text when the
    /// `"Name" <addr>` pattern is absent.
    pub sender_name: Option<String>,
    /// Sender address, verbatim as received (same fallback).
    pub sender_email: Option<String>,
    /// Decoded Subject header.
    pub subject: Option<String>,
    /// Preferred HTML body (text/plain is upgraded to minimal HTML).
    pub html_body: Option<String>,
    /// Date header, when present and parseable.
    pub received_at: Option<DateTime<Utc>>,
}

impl ParsedMail {
    /// Parses a raw message blob. Never fails; unsalvageable fields
    /// stay `None`.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let message = Message::parse(raw);

        let (sender_name, sender_email) = match message.from() {
            Some(from) => {
                let (name, email) = split_sender(&from);
                (Some(name), Some(email))
            }
            None => (None, None),
        };

        let html_body = message
            .html_body()
            .or_else(|| message.text_body().map(|text| text_as_html(&text)));

        Self {
            sender_name,
            sender_email,
            subject: message.subject(),
            html_body,
            received_at: message.date().map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Domain of the sender address (text after the last `@`), if any.
    #[must_use]
    pub fn sender_domain(&self) -> Option<&str> {
        self.sender_email
            .as_deref()
            .and_then(|addr| addr.rsplit_once('@').map(|(_, domain)| domain))
    }
}

/// Splits a From header into display name and address.
///
/// `"Acme Weekly" <news@acme.io>` → (`Acme Weekly`, `news@acme.io`).
/// When the angle-bracket pattern is absent both values are the full
/// raw text; that is the deliberate fallback, not an error.
fn split_sender(from: &str) -> (String, String) {
    let trimmed = from.trim();
    if let Some(open) = trimmed.rfind('<') {
        if trimmed.ends_with('>') && open > 0 {
            let name = trimmed[..open].trim().trim_matches('"').trim();
            let email = trimmed[open + 1..trimmed.len() - 1].trim();
            if !name.is_empty() && !email.is_empty() {
                return (name.to_string(), email.to_string());
            }
        }
    }
    (trimmed.to_string(), trimmed.to_string())
}

/// Minimal HTML rendering of a plain-text body, for messages that
/// never carried a text/html part.
fn text_as_html(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let mut out = String::with_capacity(escaped.len() + 32);
    out.push_str("<p>");
    out.push_str(&escaped.replace('\n', "<br>"));
    out.push_str("</p>");
    out
}

/// Machine-generated summary of one issue: short subject → prose.
///
/// Insertion order is display order and survives persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summary(IndexMap<String, String>);

impl Summary {
    /// Sentinel key used when summarization exhausts its retries.
    pub const FAILURE_KEY: &'static str = "요약을 실패했습니다.";
    /// Sentinel value accompanying [`Self::FAILURE_KEY`].
    pub const FAILURE_VALUE: &'static str = "본문을 확인해주세요.";

    /// Wraps an ordered subject → prose map.
    #[must_use]
    pub const fn new(entries: IndexMap<String, String>) -> Self {
        Self(entries)
    }

    /// The fixed fallback returned when summarization fails.
    #[must_use]
    pub fn sentinel() -> Self {
        let mut entries = IndexMap::new();
        entries.insert(
            Self::FAILURE_KEY.to_string(),
            Self::FAILURE_VALUE.to_string(),
        );
        Self(entries)
    }

    /// Whether this is the failure sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.0.len() == 1
            && self
                .0
                .get(Self::FAILURE_KEY)
                .is_some_and(|v| v == Self::FAILURE_VALUE)
    }

    /// Number of summary entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the summary has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The durable record written once per ingested message.
#[derive(Debug, Clone)]
pub struct MailRecord {
    /// Unique identifier (assigned on insert).
    pub id: Option<i64>,
    /// Stable storage object identifier; unique per record.
    pub content_key: String,
    /// Decoded subject.
    pub subject: Option<String>,
    /// Ordered summary.
    pub summary: Summary,
    /// Translated body; `None` unless the source language requires
    /// translation and the oracle succeeded.
    pub translated_body: Option<String>,
    /// Resolved newsletter source.
    pub newsletter_id: i64,
    /// Ingestion timestamp.
    pub received_at: DateTime<Utc>,
}

impl MailRecord {
    /// Web read link for this record, used by ops logs and
    /// notifications.
    #[must_use]
    pub fn read_link(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let key = &self.content_key;
        format!("{base}/read?mail={key}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sender_name_and_address() {
        let (name, email) = split_sender("\"Acme Weekly\" <news@acme.io>");
        assert_eq!(name, "Acme Weekly");
        assert_eq!(email, "news@acme.io");

        let (name, email) = split_sender("Acme Weekly <news@acme.io>");
        assert_eq!(name, "Acme Weekly");
        assert_eq!(email, "news@acme.io");
    }

    #[test]
    fn test_split_sender_fallback_uses_full_text() {
        let (name, email) = split_sender("news@acme.io");
        assert_eq!(name, "news@acme.io");
        assert_eq!(email, "news@acme.io");
    }

    #[test]
    fn test_parse_simple_message() {
        let raw = concat!(
            "From: \"Acme Weekly\" <news@acme.io>\r\n",
            "Subject: This week\r\n",
            "Date: Tue, 05 Aug 2025 09:30:00 +0900\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>issue</p>\r\n"
        );

        let parsed = ParsedMail::parse(raw.as_bytes());
        assert_eq!(parsed.sender_name.as_deref(), Some("Acme Weekly"));
        assert_eq!(parsed.sender_email.as_deref(), Some("news@acme.io"));
        assert_eq!(parsed.subject.as_deref(), Some("This week"));
        assert!(parsed.html_body.as_ref().unwrap().contains("<p>issue</p>"));
        assert!(parsed.received_at.is_some());
        assert_eq!(parsed.sender_domain(), Some("acme.io"));
    }

    #[test]
    fn test_parse_plain_text_upgraded_to_html() {
        let raw = concat!(
            "From: news@acme.io\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "line one\nline <two>\r\n"
        );

        let parsed = ParsedMail::parse(raw.as_bytes());
        let html = parsed.html_body.unwrap();
        assert!(html.contains("line one<br>line &lt;two&gt;"));
    }

    #[test]
    fn test_parse_garbage_degrades_to_none() {
        let parsed = ParsedMail::parse(b"\xff\xfe total garbage");
        assert!(parsed.sender_name.is_none());
        assert!(parsed.sender_email.is_none());
        assert!(parsed.subject.is_none());
        assert!(parsed.received_at.is_none());
    }

    #[test]
    fn test_summary_sentinel() {
        let sentinel = Summary::sentinel();
        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.len(), 1);

        let mut entries = IndexMap::new();
        entries.insert("제목".to_string(), "내용".to_string());
        assert!(!Summary::new(entries).is_sentinel());
    }

    #[test]
    fn test_summary_json_preserves_order() {
        let mut entries = IndexMap::new();
        entries.insert("z-first".to_string(), "one".to_string());
        entries.insert("a-second".to_string(), "two".to_string());
        let summary = Summary::new(entries);

        let json = serde_json::to_string(&summary).unwrap();
        let restored: Summary = serde_json::from_str(&json).unwrap();

        let keys: Vec<_> = restored.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["z-first", "a-second"]);
        assert_eq!(restored, summary);
    }

    #[test]
    fn test_read_link() {
        let record = MailRecord {
            id: Some(1),
            content_key: "inbox/abc123".to_string(),
            subject: None,
            summary: Summary::sentinel(),
            translated_body: None,
            newsletter_id: 7,
            received_at: Utc::now(),
        };

        assert_eq!(
            record.read_link("https://mail.press/"),
            "https://mail.press/read?mail=inbox/abc123"
        );
    }
}
