//! Text normalisation for the scorers.

use std::sync::LazyLock;

use regex::Regex;

/// Keeps letters, digits, whitespace and apostrophes (contractions).
static RE_SENTIMENT_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s']").unwrap());
/// Keeps letters, digits, whitespace and hyphens (`one-off`, `fine-tune`).
static RE_KEYWORD_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s-]").unwrap());

const MIN_TOKEN_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStyle {
    Sentiment,
    Keyword,
}

/// Lower-cases, strips punctuation for `style`, splits on whitespace and
/// drops tokens shorter than two characters. Apostrophes survive only inside
/// a word, so `'fixed'` reads as `fixed` and `didn't` stays whole.
pub fn tokenize(text: &str, style: TokenStyle) -> Vec<String> {
    let lowered = text.to_lowercase();
    let pattern = match style {
        TokenStyle::Sentiment => &*RE_SENTIMENT_STRIP,
        TokenStyle::Keyword => &*RE_KEYWORD_STRIP,
    };
    pattern
        .replace_all(&lowered, " ")
        .split_whitespace()
        .map(|word| word.trim_matches('\''))
        .filter(|word| word.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Lower-cased text with every run of non-alphanumerics collapsed to one
/// space and padded on both ends, so `" kw "` containment is a whole-word
/// (or whole-phrase) match.
pub fn word_boundary_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }
    if !out.ends_with(' ') {
        out.push(' ');
    }
    out
}

/// Whole-word containment of `keyword` in text prepared by [`word_boundary_text`].
pub fn contains_word(prepared: &str, keyword: &str) -> bool {
    prepared.contains(&format!(" {} ", keyword))
}

/// Joins the non-empty parts with single spaces.
pub fn join_fields<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
