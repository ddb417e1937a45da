//! Text normalization for newsletter matching and oracle input.
//!
//! Everything here produces internal comparison keys or oracle
//! payloads; none of it is user-facing output.

use std::ops::RangeInclusive;

/// Comparison keys are capped after normalization so substring
/// matching stays cheap on very large newsletters.
pub const MAX_BODY_KEY_CHARS: usize = 10_000;

/// Translation input is capped before submission to the oracle.
pub const MAX_TRANSLATE_SOURCE_CHARS: usize = 5_500;

/// The set of non-ASCII script characters that survive normalization.
///
/// Match keys keep ASCII alphanumerics plus these ranges; everything
/// else (whitespace, punctuation, symbols, emoji) is stripped.
#[derive(Debug, Clone)]
pub struct ScriptSet {
    ranges: Vec<RangeInclusive<char>>,
}

impl ScriptSet {
    /// Builds a script set from explicit character ranges.
    #[must_use]
    pub const fn new(ranges: Vec<RangeInclusive<char>>) -> Self {
        Self { ranges }
    }

    /// Korean Hangul: syllables, Jamo, and compatibility Jamo.
    #[must_use]
    pub fn hangul() -> Self {
        Self::new(vec!['가'..='힣', 'ᄀ'..='ᇿ', 'ㄱ'..='ㆎ'])
    }

    /// Whether `c` belongs to the allowed script ranges.
    #[must_use]
    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|range| range.contains(&c))
    }
}

impl Default for ScriptSet {
    fn default() -> Self {
        Self::hangul()
    }
}

/// Builds a case/whitespace/punctuation-insensitive comparison key.
///
/// Lower-cases, then keeps only ASCII alphanumerics and the allowed
/// script characters.
#[must_use]
pub fn match_key(text: &str, scripts: &ScriptSet) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || scripts.contains(*c))
        .collect()
}

/// Builds the comparison key for an HTML body.
///
/// Strips script/style/head content, extracts visible text,
/// normalizes it, then truncates to [`MAX_BODY_KEY_CHARS`]. The cap is
/// applied after normalization, never before, so markup does not count
/// against it.
#[must_use]
pub fn comparable_body(html: &str, scripts: &ScriptSet) -> String {
    let key = match_key(&visible_text(html), scripts);
    truncate_chars(key, MAX_BODY_KEY_CHARS)
}

/// Extracts the visible text the summarization oracle should see:
/// one line, whitespace collapsed.
#[must_use]
pub fn summarizable_text(html: &str) -> String {
    let text = visible_text(html);
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

/// Extracts translation input: visible text with paragraph structure
/// kept as single newlines, capped at [`MAX_TRANSLATE_SOURCE_CHARS`].
#[must_use]
pub fn translatable_text(html: &str) -> String {
    let text = visible_text(html);
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    truncate_chars(joined, MAX_TRANSLATE_SOURCE_CHARS)
}

fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s,
    }
}

/// Strips an HTML document down to its visible text.
///
/// Comments and the content of script/style/head containers are
/// removed entirely; block-level tags become newlines, other tags
/// become spaces; the common entities are decoded. This is a matching
/// aid, not an HTML renderer.
#[must_use]
pub fn visible_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        push_entity_decoded(&mut out, &rest[..lt]);
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |i| &after[i + 3..]);
            continue;
        }

        let Some(gt) = rest.find('>') else {
            // Unterminated tag: nothing visible can follow.
            return out;
        };
        let tag = &rest[1..gt];
        rest = &rest[gt + 1..];

        let name = tag_name(tag);
        if !tag.starts_with('/') && matches!(name.as_str(), "script" | "style" | "head") {
            rest = skip_container(rest, &name);
        }

        if is_block_tag(&name) {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }

    push_entity_decoded(&mut out, rest);
    out
}

/// Lower-cased element name of a raw tag body (`/DIV class=x` → `div`).
fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "br" | "p"
            | "div"
            | "tr"
            | "td"
            | "li"
            | "ul"
            | "ol"
            | "table"
            | "blockquote"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    )
}

/// Skips past the matching close tag of a non-visible container.
fn skip_container<'a>(mut rest: &'a str, name: &str) -> &'a str {
    let closing = format!("</{name}");
    loop {
        let Some(lt) = rest.find('<') else { return "" };
        rest = &rest[lt..];
        let matches_closing = rest
            .get(..closing.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&closing));
        if matches_closing {
            return rest.find('>').map_or("", |gt| &rest[gt + 1..]);
        }
        rest = &rest[1..];
    }
}

/// Appends `text` to `out`, decoding common HTML entities.
fn push_entity_decoded(out: &mut String, text: &str) {
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let window = rest.get(..rest.len().min(10)).unwrap_or(rest);
        let Some(semi) = window.find(';') else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };

        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => decode_numeric_entity(entity),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    let code = entity.strip_prefix('#')?;
    let value = if let Some(hex) = code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        code.parse().ok()?
    };
    char::from_u32(value)
}
