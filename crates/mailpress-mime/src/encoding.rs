//! MIME decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 encoded-word
//! headers. Only the decoding direction is implemented; mailpress
//! ingests mail, it never generates it.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// Invalid UTF-8 in the decoded bytes is replaced rather than
/// rejected; newsletter senders are not uniformly well-behaved.
///
/// # Errors
///
/// Returns an error if the input contains an invalid escape sequence.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let mut result = Vec::new();
    let mut bytes = text.bytes().peekable();

    while let Some(b) = bytes.next() {
        if b == b'=' {
            // Soft line break
            if bytes.peek() == Some(&b'\r') {
                bytes.next();
                if bytes.peek() == Some(&b'\n') {
                    bytes.next();
                }
                continue;
            }
            if bytes.peek() == Some(&b'\n') {
                bytes.next();
                continue;
            }

            let hi = bytes.next();
            let lo = bytes.next();
            match (hi, lo) {
                (Some(hi), Some(lo)) => {
                    let hex = [hi, lo];
                    let hex = std::str::from_utf8(&hex)
                        .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                    let byte = u8::from_str_radix(hex, 16)
                        .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                    result.push(byte);
                }
                _ => {
                    return Err(Error::InvalidEncoding(
                        "Incomplete escape sequence".to_string(),
                    ));
                }
            }
        } else {
            result.push(b);
        }
    }

    Ok(String::from_utf8_lossy(&result).into_owned())
}

/// Decodes RFC 2047 encoded-words within a header value.
///
/// Encoded-words (`=?charset?B|Q?text?=`) may appear anywhere in the
/// value and are decoded in place; plain segments pass through
/// untouched. Whitespace between two adjacent encoded-words is
/// dropped per the RFC.
///
/// # Errors
///
/// Returns an error if an encoded-word is structurally valid but its
/// payload cannot be decoded.
pub fn decode_rfc2047(value: &str) -> Result<String> {
    let mut out = String::new();
    let mut rest = value;
    let mut after_encoded_word = false;

    while let Some(start) = rest.find("=?") {
        let plain = &rest[..start];
        // Whitespace separating two encoded-words is not significant.
        if !(after_encoded_word && plain.chars().all(char::is_whitespace)) {
            out.push_str(plain);
        }

        let candidate = &rest[start..];
        match split_encoded_word(candidate) {
            Some((word, remainder)) => {
                out.push_str(&decode_encoded_word(word)?);
                rest = remainder;
                after_encoded_word = true;
            }
            None => {
                // Not a real encoded-word; emit the marker and move on.
                out.push_str("=?");
                rest = &candidate[2..];
                after_encoded_word = false;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Splits a leading `=?..?..?..?=` encoded-word off `text`.
fn split_encoded_word(text: &str) -> Option<(&str, &str)> {
    let end = text.find("?=")?;
    if end < 2 {
        return None;
    }
    let word = &text[..end + 2];
    // Must be exactly =? charset ? encoding ? payload ?=
    let inner = &word[2..word.len() - 2];
    if inner.split('?').count() == 3 {
        Some((word, &text[end + 2..]))
    } else {
        None
    }
}

/// Decodes a single well-formed encoded-word.
fn decode_encoded_word(word: &str) -> Result<String> {
    let inner = &word[2..word.len() - 2];
    let mut parts = inner.split('?');
    let _charset = parts.next().unwrap_or_default();
    let encoding = parts.next().unwrap_or_default();
    let payload = parts.next().unwrap_or_default();

    match encoding.to_ascii_uppercase().as_str() {
        "B" => {
            let decoded = decode_base64(payload)?;
            Ok(String::from_utf8_lossy(&decoded).into_owned())
        }
        "Q" => {
            // Q encoding uses underscore for space.
            let text = payload.replace('_', " ");
            decode_quoted_printable(&text)
        }
        other => Err(Error::InvalidEncoding(format!(
            "Unknown encoding: {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_decode() {
        let decoded = decode_base64("SGVsbG8sIFdvcmxkIQ==").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(
            decode_quoted_printable("Hello, World!").unwrap(),
            "Hello, World!"
        );
        assert_eq!(decode_quoted_printable("H=C3=A9llo").unwrap(), "Héllo");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(
            decode_quoted_printable("Hello=\r\nWorld").unwrap(),
            "HelloWorld"
        );
        assert_eq!(decode_quoted_printable("Hello=\nWorld").unwrap(), "HelloWorld");
    }

    #[test]
    fn test_quoted_printable_incomplete_escape() {
        assert!(decode_quoted_printable("oops=4").is_err());
    }

    #[test]
    fn test_rfc2047_plain_passthrough() {
        assert_eq!(decode_rfc2047("Acme Weekly").unwrap(), "Acme Weekly");
    }

    #[test]
    fn test_rfc2047_base64_word() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
    }

    #[test]
    fn test_rfc2047_q_word() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo?=").unwrap(), "Héllo");
    }

    #[test]
    fn test_rfc2047_mixed_value() {
        assert_eq!(
            decode_rfc2047("Re: =?utf-8?B?SMOpbGxv?= thread").unwrap(),
            "Re: Héllo thread"
        );
    }

    #[test]
    fn test_rfc2047_adjacent_words_drop_space() {
        assert_eq!(
            decode_rfc2047("=?utf-8?B?SMOp?= =?utf-8?B?bGxv?=").unwrap(),
            "Héllo"
        );
    }

    #[test]
    fn test_rfc2047_korean_subject() {
        // "뉴스레터" encoded as a single Base64 word.
        assert_eq!(
            decode_rfc2047("=?UTF-8?B?64m07Iqk66CI7YSw?=").unwrap(),
            "뉴스레터"
        );
    }

    #[test]
    fn test_rfc2047_false_marker() {
        assert_eq!(decode_rfc2047("price =? value").unwrap(), "price =? value");
    }

    #[test]
    fn test_rfc2047_degenerate_marker() {
        assert_eq!(decode_rfc2047("=?=").unwrap(), "=?=");
    }
}
