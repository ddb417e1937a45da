//! Newsletter source data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication language of a newsletter source.
///
/// Drives prompt selection: Korean sources are summarized natively,
/// English sources are summarized-and-translated, and their body is
/// additionally run through the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    /// Korean-language newsletter (the reader's locale).
    #[default]
    Korean,
    /// English-language newsletter; requires translation.
    English,
}

impl SourceLanguage {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "en" | "english" => Self::English,
            _ => Self::Korean,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Korean => "ko",
            Self::English => "en",
        }
    }

    /// Whether mail from this source gets a translated body.
    #[must_use]
    pub const fn needs_translation(&self) -> bool {
        matches!(self, Self::English)
    }
}

/// Whether a source is still sending issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingStatus {
    /// Actively publishing.
    #[default]
    Active,
    /// Registered but dormant or discontinued.
    Inactive,
}

impl OperatingStatus {
    /// Parse from the database integer representation.
    #[must_use]
    pub const fn from_flag(flag: i64) -> Self {
        if flag == 0 {
            Self::Inactive
        } else {
            Self::Active
        }
    }

    /// Convert to the database integer representation.
    #[must_use]
    pub const fn as_flag(&self) -> i64 {
        match self {
            Self::Active => 1,
            Self::Inactive => 0,
        }
    }
}

/// A registered logical publisher incoming mail can be routed to.
///
/// Loaded as a fresh snapshot per resolution call; registry state can
/// change between pipeline runs.
#[derive(Debug, Clone)]
pub struct NewsletterSource {
    /// Unique identifier.
    pub id: i64,
    /// Canonical display name.
    pub name: String,
    /// Publication language.
    pub language: SourceLanguage,
    /// Known sending addresses (verbatim, as registered).
    pub email_addresses: Vec<String>,
    /// Whether the source is still publishing.
    pub operating_status: OperatingStatus,
    /// When the most recent issue arrived.
    pub last_received_at: Option<DateTime<Utc>>,
}

impl NewsletterSource {
    /// Domain (text after the last `@`) of each known address.
    pub fn address_domains(&self) -> impl Iterator<Item = &str> {
        self.email_addresses
            .iter()
            .filter_map(|addr| addr.rsplit_once('@').map(|(_, domain)| domain))
    }
}
