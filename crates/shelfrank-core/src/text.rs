//! Pure text normalization shared by feature building and query
//! vectorization. Both sides of the similarity computation must pass through
//! the same function or the vocabularies drift apart.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]+").expect("invalid RE_NON_WORD"));
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("invalid RE_WHITESPACE"));

/// Canonical matchable form of a piece of text: lowercased, word characters
/// and whitespace only, runs of whitespace collapsed to single spaces,
/// trimmed. Total: every input maps to a (possibly empty) string.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = RE_NON_WORD.replace_all(&lowered, "");
    let collapsed = RE_WHITESPACE.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

/// Concatenate text fields in a fixed order, then normalize. Empty parts are
/// harmless: the whitespace collapse swallows the extra separators.
pub fn combine<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = parts.into_iter().collect::<Vec<_>>().join(" ");
    normalize(&joined)
}
