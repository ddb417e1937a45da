//! # mailpress-mime
//!
//! Decode-only MIME parsing for the mailpress ingestion pipeline.
//!
//! This crate turns a raw newsletter blob into structured headers and
//! a body part tree:
//! - Header unfolding with RFC 2047 encoded-word decoding
//! - Quoted-Printable and Base64 transfer decoding
//! - Content-Type parameters (charset, boundary)
//! - Multipart recursion with HTML/plain body selection
//!
//! Parsing is lenient end to end: the ingestion pipeline must degrade
//! on malformed input, never abort, so the only hard errors live in
//! the low-level decoders.

#![forbid(unsafe_code)]

mod content_type;
mod encoding;
mod error;
mod header;
mod message;

pub use content_type::ContentType;
pub use encoding::{decode_base64, decode_quoted_printable, decode_rfc2047};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_never_panics(raw in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let _ = Message::parse(&raw);
        }

        #[test]
        fn quoted_printable_ascii_roundtrips(text in "[ -<>-~]{0,128}") {
            // Printable ASCII without '=' passes through untouched.
            prop_assert_eq!(decode_quoted_printable(&text).unwrap(), text);
        }
    }
}
