//! Raw message parsing.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::error::Result;
use crate::header::Headers;
use chrono::{DateTime, FixedOffset};

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from a header value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

/// One node of a parsed message: either a leaf body or a multipart
/// container with child parts.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Raw body bytes (empty for multipart containers).
    pub body: Vec<u8>,
    /// Child parts (empty for leaf parts).
    pub children: Vec<Part>,
}

impl Part {
    /// Gets the content type, defaulting to text/plain.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|raw| ContentType::parse(raw).ok())
            .unwrap_or_else(ContentType::text_plain)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if Base64 or Quoted-Printable decoding fails.
    pub fn decoded_text(&self) -> Result<String> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => {
                let body_str = String::from_utf8_lossy(&self.body);
                // Remove whitespace for lenient parsing
                let cleaned: String = body_str.chars().filter(|c| !c.is_whitespace()).collect();
                let decoded = decode_base64(&cleaned)?;
                Ok(String::from_utf8_lossy(&decoded).into_owned())
            }
            TransferEncoding::QuotedPrintable => {
                decode_quoted_printable(&String::from_utf8_lossy(&self.body))
            }
            _ => Ok(String::from_utf8_lossy(&self.body).into_owned()),
        }
    }

    /// Depth-first search for the first part matching `pred`.
    fn find(&self, pred: &impl Fn(&ContentType) -> bool) -> Option<&Self> {
        if self.children.is_empty() {
            if pred(&self.content_type()) {
                return Some(self);
            }
            return None;
        }
        self.children.iter().find_map(|child| child.find(pred))
    }

    fn parse_node(text: &str) -> Self {
        let headers = Headers::parse(text);
        let body = body_section(text);

        let ct = headers
            .get("content-type")
            .and_then(|raw| ContentType::parse(raw).ok())
            .unwrap_or_else(ContentType::text_plain);

        if let (true, Some(boundary)) = (ct.is_multipart(), ct.boundary()) {
            let children = split_multipart(body, boundary)
                .into_iter()
                .map(Self::parse_node)
                .collect();
            return Self {
                headers,
                body: Vec::new(),
                children,
            };
        }

        Self {
            headers,
            body: body.as_bytes().to_vec(),
            children: Vec::new(),
        }
    }
}

/// A fully parsed incoming message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Top-level message headers.
    pub headers: Headers,
    /// Root part (the whole body tree).
    pub root: Part,
}

impl Message {
    /// Parses a raw message blob.
    ///
    /// Parsing is deliberately lenient: unknown structure degrades to
    /// a single text/plain part rather than failing, and byte content
    /// that is not valid UTF-8 is replaced lossily.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let root = Part::parse_node(&text);
        Self {
            headers: root.headers.clone(),
            root,
        }
    }

    /// Gets the decoded From header.
    #[must_use]
    pub fn from(&self) -> Option<String> {
        self.headers.get_decoded("from")
    }

    /// Gets the decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers.get_decoded("subject")
    }

    /// Gets the Date header parsed as RFC 2822.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.headers
            .get("date")
            .and_then(|raw| DateTime::parse_from_rfc2822(raw.trim()).ok())
    }

    /// Gets the first text/html body in the part tree, decoded.
    #[must_use]
    pub fn html_body(&self) -> Option<String> {
        self.root
            .find(&ContentType::is_html)
            .and_then(|part| part.decoded_text().ok())
    }

    /// Gets the first text/plain body in the part tree, decoded.
    #[must_use]
    pub fn text_body(&self) -> Option<String> {
        self.root
            .find(&ContentType::is_plain_text)
            .and_then(|part| part.decoded_text().ok())
    }
}

/// Returns the body section of a raw part (everything after the first
/// blank line). A part with no blank line has no body.
fn body_section(text: &str) -> &str {
    if let Some(idx) = text.find("\r\n\r\n") {
        &text[idx + 4..]
    } else if let Some(idx) = text.find("\n\n") {
        &text[idx + 2..]
    } else {
        ""
    }
}

/// Splits a multipart body into its sections.
///
/// Sections are delimited by `--boundary` lines; `--boundary--`
/// terminates the body. Preamble and epilogue are discarded.
fn split_multipart<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    let terminator = format!("--{boundary}--");

    let mut sections = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == terminator || trimmed == delimiter {
            if let Some(start) = current_start.take() {
                sections.push(body[start..offset].trim_end_matches(['\r', '\n']));
            }
            if trimmed == terminator {
                break;
            }
            current_start = Some(offset + line.len());
        }
        offset += line.len();
    }

    // Tolerate a missing terminator line.
    if let Some(start) = current_start {
        sections.push(body[start..].trim_end_matches(['\r', '\n']));
    }

    sections
}
