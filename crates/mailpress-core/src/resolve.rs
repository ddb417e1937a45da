//! Multi-strategy newsletter resolution.
//!
//! Maps a parsed message onto a registered newsletter source by trying
//! four strategies in strict priority order. The order is a contract:
//! display names survive rotating sender addresses, so name signals
//! outrank address signals, and an exact address outranks its domain.

use std::collections::BTreeSet;

use crate::mail::ParsedMail;
use crate::source::NewsletterSource;
use crate::text::{ScriptSet, comparable_body, match_key};

/// Public mail providers and mass-mail platforms whose domains can
/// never identify a single newsletter.
pub const DOMAIN_BLACKLIST: &[&str] = &[
    "gmail.com",
    "naver.com",
    "daum.net",
    "kakao.com",
    "outlook.com",
    "hotmail.com",
    "yahoo.com",
    "stibee.com",
    "mail.stibee.com",
    "mailchimp.com",
    "sendgrid.net",
    "substack.com",
];

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    /// Normalized source name contained in the sender display name.
    FromName,
    /// Normalized source name contained in the message body.
    HtmlBody,
    /// Sender address equals a known address, verbatim.
    Email,
    /// Sender domain maps to exactly one source.
    Domain,
    /// No strategy matched.
    None,
}

impl MatchedBy {
    /// Short name for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FromName => "from_name",
            Self::HtmlBody => "html_body",
            Self::Email => "email",
            Self::Domain => "domain",
            Self::None => "none",
        }
    }
}

/// Outcome of one resolution call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    /// The matched source, or `None` when the message is rejected.
    pub newsletter_id: Option<i64>,
    /// The strategy that matched.
    pub matched_by: MatchedBy,
}

impl MatchResult {
    const fn rejected() -> Self {
        Self {
            newsletter_id: None,
            matched_by: MatchedBy::None,
        }
    }
}

/// Resolves a parsed message against a snapshot of known sources.
///
/// Strategies run in priority order and the first success wins; a
/// failed strategy never blocks a later one, except that an ambiguous
/// domain is a rejection rather than a fall-through.
#[must_use]
pub fn resolve(mail: &ParsedMail, sources: &[NewsletterSource], scripts: &ScriptSet) -> MatchResult {
    let strategies: [fn(&ParsedMail, &[NewsletterSource], &ScriptSet) -> Option<i64>; 4] = [
        by_from_name,
        by_html_body,
        by_email,
        by_domain,
    ];
    let tags = [
        MatchedBy::FromName,
        MatchedBy::HtmlBody,
        MatchedBy::Email,
        MatchedBy::Domain,
    ];

    for (strategy, tag) in strategies.iter().zip(tags) {
        if let Some(id) = strategy(mail, sources, scripts) {
            return MatchResult {
                newsletter_id: Some(id),
                matched_by: tag,
            };
        }
    }
    MatchResult::rejected()
}

/// Strategy 1: normalized source name contained in the normalized
/// sender display name. First source in snapshot order wins.
fn by_from_name(mail: &ParsedMail, sources: &[NewsletterSource], scripts: &ScriptSet) -> Option<i64> {
    let name_key = match_key(mail.sender_name.as_deref()?, scripts);
    if name_key.is_empty() {
        return None;
    }
    sources
        .iter()
        .find(|source| {
            let source_key = match_key(&source.name, scripts);
            !source_key.is_empty() && name_key.contains(&source_key)
        })
        .map(|source| source.id)
}

/// Strategy 2: normalized source name contained in the capped
/// comparison key of the body.
fn by_html_body(mail: &ParsedMail, sources: &[NewsletterSource], scripts: &ScriptSet) -> Option<i64> {
    let body_key = comparable_body(mail.html_body.as_deref()?, scripts);
    if body_key.is_empty() {
        return None;
    }
    sources
        .iter()
        .find(|source| {
            let source_key = match_key(&source.name, scripts);
            !source_key.is_empty() && body_key.contains(&source_key)
        })
        .map(|source| source.id)
}

/// Strategy 3: sender address equals a known address. Case-sensitive,
/// compared verbatim as received.
fn by_email(mail: &ParsedMail, sources: &[NewsletterSource], _scripts: &ScriptSet) -> Option<i64> {
    let sender = mail.sender_email.as_deref()?;
    sources
        .iter()
        .find(|source| source.email_addresses.iter().any(|addr| addr == sender))
        .map(|source| source.id)
}

/// Strategy 4: sender domain shared with exactly one source.
///
/// Blacklisted domains are rejected outright, and a domain claimed by
/// two or more distinct sources identifies nobody.
fn by_domain(mail: &ParsedMail, sources: &[NewsletterSource], _scripts: &ScriptSet) -> Option<i64> {
    let domain = mail.sender_domain()?;
    if DOMAIN_BLACKLIST
        .iter()
        .any(|blocked| blocked.eq_ignore_ascii_case(domain))
    {
        return None;
    }

    // Domains are case-insensitive.
    let candidates: BTreeSet<i64> = sources
        .iter()
        .filter(|source| {
            source
                .address_domains()
                .any(|d| d.eq_ignore_ascii_case(domain))
        })
        .map(|source| source.id)
        .collect();

    if candidates.len() == 1 {
        candidates.into_iter().next()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{OperatingStatus, SourceLanguage};

    fn source(id: i64, name: &str, addresses: &[&str]) -> NewsletterSource {
        NewsletterSource {
            id,
            name: name.to_string(),
            language: SourceLanguage::Korean,
            email_addresses: addresses.iter().map(ToString::to_string).collect(),
            operating_status: OperatingStatus::Active,
            last_received_at: None,
        }
    }

    fn mail(name: Option<&str>, email: Option<&str>, body: Option<&str>) -> ParsedMail {
        ParsedMail {
            sender_name: name.map(ToString::to_string),
            sender_email: email.map(ToString::to_string),
            subject: None,
            html_body: body.map(ToString::to_string),
            received_at: None,
        }
    }

    #[test]
    fn test_from_name_containment_wins() {
        let sources = vec![source(1, "Acme Weekly", &["news@acme.io"])];
        let mail = mail(
            Some("The Acme Weekly Team"),
            Some("noreply@other.io"),
            None,
        );

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, Some(1));
        assert_eq!(result.matched_by, MatchedBy::FromName);
    }

    #[test]
    fn test_from_name_beats_body_when_both_match() {
        let sources = vec![source(1, "Acme Weekly", &["news@acme.io"])];
        let mail = mail(
            Some("\u{201c}Acme Weekly\u{201d}"),
            Some("news@unknown-domain.io"),
            Some("<p>Acme Weekly Digest</p>"),
        );

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, Some(1));
        assert_eq!(result.matched_by, MatchedBy::FromName);
    }

    #[test]
    fn test_body_containment() {
        let sources = vec![source(2, "뉴스레터", &["letter@news.kr"])];
        let mail = mail(
            Some("알림"),
            Some("noreply@elsewhere.io"),
            Some("<div>오늘의 <b>뉴스 레터</b> 입니다</div>"),
        );

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, Some(2));
        assert_eq!(result.matched_by, MatchedBy::HtmlBody);
    }

    #[test]
    fn test_exact_email_is_case_sensitive() {
        let sources = vec![source(3, "Daily", &["News@daily.io"])];

        let exact = mail(None, Some("News@daily.io"), None);
        let result = resolve(&exact, &sources, &ScriptSet::hangul());
        assert_eq!(result.matched_by, MatchedBy::Email);
        assert_eq!(result.newsletter_id, Some(3));

        // Lowercased address misses the exact strategy but still lands
        // on the source through its domain.
        let lower = mail(None, Some("news@daily.io"), None);
        let result = resolve(&lower, &sources, &ScriptSet::hangul());
        assert_eq!(result.matched_by, MatchedBy::Domain);
    }

    #[test]
    fn test_domain_match_unique() {
        let sources = vec![
            source(4, "Tech Brief", &["hello@techbrief.io"]),
            source(5, "Other", &["other@elsewhere.io"]),
        ];
        let mail = mail(None, Some("bounce-77@techbrief.io"), None);

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, Some(4));
        assert_eq!(result.matched_by, MatchedBy::Domain);
    }

    #[test]
    fn test_domain_match_ambiguous_rejects() {
        let sources = vec![
            source(4, "Tech Brief", &["hello@shared.io"]),
            source(5, "Biz Brief", &["team@shared.io"]),
        ];
        let mail = mail(None, Some("anyone@shared.io"), None);

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, None);
        assert_eq!(result.matched_by, MatchedBy::None);
    }

    #[test]
    fn test_domain_match_ignores_case() {
        let sources = vec![source(10, "Daily", &["news@Acme.IO"])];
        let mail = mail(None, Some("digest@acme.io"), None);

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, Some(10));
        assert_eq!(result.matched_by, MatchedBy::Domain);
    }

    #[test]
    fn test_domain_shared_by_one_source_many_addresses() {
        let sources = vec![source(6, "Daily", &["a@daily.io", "b@daily.io"])];
        let mail = mail(None, Some("c@daily.io"), None);

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, Some(6));
    }

    #[test]
    fn test_blacklisted_domain_never_matches() {
        let sources = vec![source(7, "Indie Letter", &["indie@gmail.com"])];
        let mail = mail(None, Some("noreply@gmail.com"), None);

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, None);
        assert_eq!(result.matched_by, MatchedBy::None);
    }

    #[test]
    fn test_no_signal_rejects() {
        let sources = vec![source(8, "Acme Weekly", &["news@acme.io"])];
        let mail = mail(Some("Stranger"), Some("x@strange.io"), Some("<p>hi</p>"));

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, None);
        assert_eq!(result.matched_by, MatchedBy::None);
    }

    #[test]
    fn test_empty_fields_do_not_match_everything() {
        // A source whose normalized name is empty must never match by
        // containment.
        let sources = vec![source(9, "---", &["x@dash.io"])];
        let mail = mail(Some("Anyone"), Some("a@b.io"), Some("<p>text</p>"));

        let result = resolve(&mail, &sources, &ScriptSet::hangul());
        assert_eq!(result.newsletter_id, None);
    }

    #[test]
    fn test_matched_by_labels() {
        assert_eq!(MatchedBy::FromName.as_str(), "from_name");
        assert_eq!(MatchedBy::Domain.as_str(), "domain");
        assert_eq!(MatchedBy::None.as_str(), "none");
    }
}
