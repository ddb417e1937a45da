//! End-to-end ingestion of one raw message.

use chrono::Utc;
use tracing::{info, warn};

use crate::alert::AlertSink;
use crate::channel::ChannelRepository;
use crate::mail::{MailRecord, MailRepository, ParsedMail};
use crate::notify::{NotificationTransport, fan_out};
use crate::oracle::CompletionOracle;
use crate::resolve::resolve;
use crate::source::SourceRepository;
use crate::store::ContentStore;
use crate::summarize::Summarizer;
use crate::text::ScriptSet;
use crate::{Error, Result};

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    /// Id of the persisted record.
    pub message_id: i64,
    /// The resolved newsletter.
    pub newsletter_id: i64,
    /// Whether the record already existed and this run changed
    /// nothing.
    pub duplicate: bool,
}

/// The ingestion pipeline.
///
/// Collaborators are injected at construction; tests swap in fakes for
/// the store, the oracle, the transport, and the alert sink. One call
/// to [`Pipeline::ingest`] processes exactly one raw message; runs for
/// distinct content keys share no mutable state, so they may proceed
/// concurrently.
pub struct Pipeline<S, O, T, A> {
    store: S,
    summarizer: Summarizer<O>,
    transport: T,
    alerts: A,
    sources: SourceRepository,
    mails: MailRepository,
    channels: ChannelRepository,
    scripts: ScriptSet,
    read_link_base: String,
}

impl<S, O, T, A> Pipeline<S, O, T, A>
where
    S: ContentStore + Sync,
    O: CompletionOracle + Sync,
    T: NotificationTransport + Sync,
    A: AlertSink + Sync,
{
    /// Assembles a pipeline from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: S,
        summarizer: Summarizer<O>,
        transport: T,
        alerts: A,
        sources: SourceRepository,
        mails: MailRepository,
        channels: ChannelRepository,
        read_link_base: impl Into<String>,
    ) -> Self {
        Self {
            store,
            summarizer,
            transport,
            alerts,
            sources,
            mails,
            channels,
            scripts: ScriptSet::default(),
            read_link_base: read_link_base.into(),
        }
    }

    /// Override the script set used for match keys.
    #[must_use]
    pub fn with_scripts(mut self, scripts: ScriptSet) -> Self {
        self.scripts = scripts;
        self
    }

    /// Ingests the message behind `content_key` end to end.
    ///
    /// Fetch, parse, resolve, summarize, persist, notify. Summarization
    /// and delivery failures degrade; only an unresolvable sender or a
    /// failed durable write surface as errors. Re-ingesting an already
    /// persisted key returns the existing record as a duplicate receipt
    /// without a second fan-out.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSource`] when no resolution strategy matched
    /// (the message is not persisted), or a storage error when the
    /// fetch or the durable write fails.
    pub async fn ingest(&self, content_key: &str) -> Result<IngestReceipt> {
        let raw = self.store.fetch(content_key).await?;
        let mail = ParsedMail::parse(&raw);
        let read_link = self.read_link(content_key);

        info!(
            content_key,
            sender = mail.sender_email.as_deref().unwrap_or("-"),
            "message fetched and parsed",
        );
        self.alerts.message_received(&mail, &read_link).await;

        let sources = self.sources.list_sources().await?;
        let resolution = resolve(&mail, &sources, &self.scripts);
        let Some(newsletter_id) = resolution.newsletter_id else {
            warn!(
                content_key,
                sender = mail.sender_email.as_deref().unwrap_or("-"),
                "no resolution strategy matched, rejecting",
            );
            self.alerts
                .unknown_sender(&mail, content_key, &read_link)
                .await;
            return Err(Error::UnknownSource {
                sender_email: mail.sender_email.unwrap_or_default(),
                content_key: content_key.to_string(),
            });
        };

        info!(
            content_key,
            newsletter_id,
            matched_by = resolution.matched_by.as_str(),
            "sender resolved",
        );

        let source = self.sources.load_by_id(newsletter_id).await?;
        let html_body = mail.html_body.clone().unwrap_or_default();

        let summary = self.summarizer.summarize(&html_body, source.language).await;
        let translated_body = if source.language.needs_translation() {
            self.summarizer.translate(&html_body).await
        } else {
            None
        };

        let record = MailRecord {
            id: None,
            content_key: content_key.to_string(),
            subject: mail.subject.clone(),
            summary,
            translated_body,
            newsletter_id,
            received_at: mail.received_at.unwrap_or_else(Utc::now),
        };

        let message_id = match self.mails.insert(&record).await {
            Ok(id) => id,
            Err(Error::DuplicateRecord(_)) => {
                // A concurrent or earlier run already ingested this
                // key; its fan-out already happened.
                let existing = self
                    .mails
                    .find_by_content_key(content_key)
                    .await?
                    .ok_or_else(|| Error::RecordNotFound(content_key.to_string()))?;
                info!(content_key, "record already persisted, skipping fan-out");
                return Ok(IngestReceipt {
                    message_id: existing.id.unwrap_or_default(),
                    newsletter_id: existing.newsletter_id,
                    duplicate: true,
                });
            }
            Err(e) => return Err(e),
        };

        self.sources
            .touch_last_received(newsletter_id, record.received_at)
            .await?;

        let channels = self.channels.channels_for_newsletter(newsletter_id).await?;
        fan_out(
            &self.transport,
            &record,
            &source,
            &channels,
            &self.read_link_base,
        )
        .await;

        Ok(IngestReceipt {
            message_id,
            newsletter_id,
            duplicate: false,
        })
    }

    /// Recomputes the summary of an already persisted record and
    /// replaces it in place. Nothing else on the record changes and no
    /// notification is sent.
    ///
    /// # Errors
    ///
    /// [`Error::RecordNotFound`] when no record exists for the key, or
    /// a storage error from the fetch or the update.
    pub async fn resummarize(&self, content_key: &str) -> Result<()> {
        let record = self
            .mails
            .find_by_content_key(content_key)
            .await?
            .ok_or_else(|| Error::RecordNotFound(content_key.to_string()))?;

        let raw = self.store.fetch(content_key).await?;
        let mail = ParsedMail::parse(&raw);
        let source = self.sources.load_by_id(record.newsletter_id).await?;

        let html_body = mail.html_body.unwrap_or_default();
        let summary = self.summarizer.summarize(&html_body, source.language).await;

        let id = record
            .id
            .ok_or_else(|| Error::RecordNotFound(content_key.to_string()))?;
        self.mails.update_summary(id, &summary).await?;

        info!(content_key, "summary replaced");
        Ok(())
    }

    /// The content store behind this pipeline.
    #[must_use]
    pub const fn content_store(&self) -> &S {
        &self.store
    }

    /// The source registry behind this pipeline.
    #[must_use]
    pub const fn source_repository(&self) -> &SourceRepository {
        &self.sources
    }

    /// The record store behind this pipeline.
    #[must_use]
    pub const fn mail_repository(&self) -> &MailRepository {
        &self.mails
    }

    /// The subscription index behind this pipeline.
    #[must_use]
    pub const fn channel_repository(&self) -> &ChannelRepository {
        &self.channels
    }

    fn read_link(&self, content_key: &str) -> String {
        let base = self.read_link_base.trim_end_matches('/');
        format!("{base}/read?mail={content_key}")
    }
}
