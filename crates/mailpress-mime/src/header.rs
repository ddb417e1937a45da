//! Header handling for incoming messages.

use crate::encoding::decode_rfc2047;
use std::collections::HashMap;

/// Collection of email headers, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// Gets the first raw value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets the first value for a header with RFC 2047 encoded-words
    /// decoded.
    ///
    /// A value whose encoded-words fail to decode is returned raw;
    /// ingestion prefers a garbled header over no header.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|raw| decode_rfc2047(raw).unwrap_or_else(|_| raw.to_string()))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns an iterator over all headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Parses headers from the header section of a raw message.
    ///
    /// Continuation lines (leading space or tab) are unfolded into the
    /// preceding header. Lines without a colon are skipped rather than
    /// rejected; a partially readable header block is still useful for
    /// resolution.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current_name: Option<String> = None;
        let mut current_value = String::new();

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if current_name.is_some() {
                    current_value.push(' ');
                    current_value.push_str(line.trim());
                }
            } else {
                if let Some(name) = current_name.take() {
                    headers.add(name, current_value.trim().to_string());
                    current_value.clear();
                }

                if let Some((name, value)) = line.split_once(':') {
                    current_name = Some(name.trim().to_string());
                    current_value = value.trim().to_string();
                }
            }
        }

        if let Some(name) = current_name {
            headers.add(name, current_value.trim().to_string());
        }

        headers
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_get_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/html");
        assert_eq!(headers.get("content-type"), Some("text/html"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/html"));
    }

    #[test]
    fn test_parse_with_continuation() {
        let text = concat!(
            "From: news@example.com\r\n",
            "Subject: Weekly\r\n",
            "Content-Type: text/html;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "body starts here\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("news@example.com"));
        assert_eq!(headers.get("Subject"), Some("Weekly"));
        assert_eq!(headers.get("Content-Type"), Some("text/html; charset=utf-8"));
        // Body content after the blank line must not leak in.
        assert!(headers.get("body starts here").is_none());
    }

    #[test]
    fn test_parse_skips_junk_lines() {
        let headers = Headers::parse("not a header line\nSubject: ok\n");
        assert_eq!(headers.get("Subject"), Some("ok"));
    }

    #[test]
    fn test_get_decoded() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?B?SMOpbGxv?=");
        assert_eq!(headers.get_decoded("Subject"), Some("Héllo".to_string()));
    }

    #[test]
    fn test_get_all() {
        let mut headers = Headers::new();
        headers.add("Received", "hop one");
        headers.add("Received", "hop two");
        assert_eq!(headers.get_all("Received").len(), 2);
    }
}
