//! # mailpress-core
//!
//! Core pipeline for the `MailPress` newsletter service.
//!
//! This crate provides:
//! - Message parsing into structured fields
//! - Multi-strategy newsletter resolution
//! - Retrying summarization and best-effort translation
//! - Durable mail records (`SQLite`)
//! - Deduplicated notification fan-out
//! - The end-to-end ingestion pipeline

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod alert;
pub mod channel;
mod error;
pub mod mail;
pub mod notify;
pub mod oracle;
pub mod resolve;
pub mod retry;
pub mod service;
pub mod source;
pub mod store;
pub mod summarize;
pub mod text;

pub use alert::{AlertSink, NullAlertSink, WebhookAlertSink};
pub use channel::{ChannelRepository, DeliveryChannel};
pub use error::{Error, Result};
pub use mail::{MailRecord, MailRepository, ParsedMail, Summary};
pub use notify::{NotificationTransport, WebhookTransport, fan_out, notification_payload};
pub use oracle::{CompletionOracle, OpenAiOracle};
pub use resolve::{DOMAIN_BLACKLIST, MatchResult, MatchedBy, resolve};
pub use retry::{Backoff, retry};
pub use service::{IngestReceipt, Pipeline};
pub use source::{NewsletterSource, OperatingStatus, SourceLanguage, SourceRepository};
pub use store::{ContentStore, FsContentStore, MemoryContentStore};
pub use summarize::{SUMMARY_ATTEMPTS, Summarizer};
pub use text::{ScriptSet, comparable_body, match_key, summarizable_text, translatable_text};
