//! Retrying summarization and best-effort translation.

use indexmap::IndexMap;
use tracing::warn;

use crate::mail::Summary;
use crate::oracle::{CompletionOracle, SUMMARY_PROMPT, SUMMARY_PROMPT_ENGLISH, TRANSLATE_PROMPT};
use crate::retry::{Backoff, retry};
use crate::source::SourceLanguage;
use crate::text::{summarizable_text, translatable_text};
use crate::{Error, Result};

/// How many oracle calls one summarization gets before the sentinel.
pub const SUMMARY_ATTEMPTS: u32 = 3;

/// Summarization and translation over a completion oracle.
pub struct Summarizer<O> {
    oracle: O,
    backoff: Backoff,
}

impl<O: CompletionOracle + Sync> Summarizer<O> {
    /// Summarizer with the default backoff policy.
    #[must_use]
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            backoff: Backoff::default(),
        }
    }

    /// Override the retry backoff (tests use [`Backoff::none`]).
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Summarizes an HTML body, selecting the prompt by source
    /// language.
    ///
    /// Retries up to [`SUMMARY_ATTEMPTS`] times on oracle failure,
    /// malformed JSON, empty output, or non-string values, then
    /// degrades to [`Summary::sentinel`]. Never returns an error;
    /// ingestion must not abort because summarization failed.
    pub async fn summarize(&self, html_body: &str, language: SourceLanguage) -> Summary {
        let text = summarizable_text(html_body);

        let (prompt, user_text) = match language {
            SourceLanguage::Korean => (SUMMARY_PROMPT, format!("뉴스:{text}")),
            SourceLanguage::English => (
                SUMMARY_PROMPT_ENGLISH,
                format!("News article to summarize and translate to Korean:\n\n{text}"),
            ),
        };

        let result = retry(SUMMARY_ATTEMPTS, self.backoff, || async {
            let reply = self.oracle.complete(prompt, &user_text).await?;
            parse_summary_reply(&reply)
        })
        .await;

        match result {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "summarization exhausted retries, using sentinel");
                Summary::sentinel()
            }
        }
    }

    /// Translates an HTML body to Korean.
    ///
    /// Input is reduced to capped plain text first; empty input skips
    /// the oracle entirely. Failure yields `None`, never an error.
    pub async fn translate(&self, html_body: &str) -> Option<String> {
        let text = translatable_text(html_body);
        if text.is_empty() {
            return None;
        }

        match self.oracle.complete(TRANSLATE_PROMPT, &text).await {
            Ok(reply) => {
                let trimmed = reply.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(e) => {
                warn!(error = %e, "translation failed, omitting translated body");
                None
            }
        }
    }
}

/// Parses one oracle reply into a validated summary.
///
/// A fenced ```json wrapper is stripped before parsing. Nested values
/// and empty maps are rejected so the retry loop can try again. The
/// reply is read into an ordered map directly; entry order is display
/// order and must survive from the oracle's document order.
fn parse_summary_reply(reply: &str) -> Result<Summary> {
    let payload = strip_json_fence(reply);

    let raw: IndexMap<String, serde_json::Value> = serde_json::from_str(payload.trim())?;
    if raw.is_empty() {
        return Err(Error::Oracle("empty summary".to_string()));
    }

    let mut entries = IndexMap::with_capacity(raw.len());
    for (key, value) in raw {
        let serde_json::Value::String(text) = value else {
            return Err(Error::Oracle(format!("non-string value for key: {key}")));
        };
        entries.insert(key, text);
    }
    Ok(Summary::new(entries))
}

/// Removes a fenced code block wrapper, when present.
fn strip_json_fence(reply: &str) -> &str {
    let Some(start) = reply.find("```json") else {
        return reply;
    };
    let inner = &reply[start + "```json".len()..];
    inner.find("```").map_or(inner, |end| &inner[..end])
}
