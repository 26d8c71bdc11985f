//! Hashtag tokens under the cursor, tag extraction and suggestion splicing.
//!
//! Cursor positions are counted in characters, not bytes.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

/// `\w` is Unicode-aware; the explicit Arabic block also admits its marks and
/// punctuation so tags written in Arabic are not cut short.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#[\w\x{0600}-\x{06FF}]+").expect("valid tag pattern")
});

fn char_to_byte(text: &str, cursor: usize) -> usize {
    text.char_indices()
        .nth(cursor)
        .map_or(text.len(), |(byte, _)| byte)
}

fn byte_to_char(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Byte range of the whitespace-delimited token that the cursor sits in or
/// directly after. Empty when the cursor follows whitespace.
fn token_range(text: &str, cursor: usize) -> (usize, usize) {
    let at = char_to_byte(text, cursor);
    let start = text[..at]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8());
    if start == at {
        return (at, at);
    }
    let end = text[at..]
        .find(char::is_whitespace)
        .map_or(text.len(), |i| at + i);
    (start, end)
}

/// The token at the cursor, e.g. `#القاهرة` for a cursor anywhere inside it.
pub fn current_token(text: &str, cursor: usize) -> &str {
    let (start, end) = token_range(text, cursor);
    &text[start..end]
}

/// The tag prefix to look up, if the token at the cursor is a hashtag with
/// at least one character after `#`.
pub fn suggestion_query(text: &str, cursor: usize) -> Option<&str> {
    let token = current_token(text, cursor);
    token.strip_prefix('#').filter(|rest| !rest.is_empty())
}

/// Distinct `#tag` substrings in order of first appearance.
pub fn extract_all_tags(text: &str) -> IndexSet<String> {
    TAG_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_owned())
        .collect()
}

/// Byte ranges of every `#tag` in `text`, for highlighting.
pub fn tag_ranges(text: &str) -> impl Iterator<Item = std::ops::Range<usize>> + '_ {
    TAG_PATTERN.find_iter(text).map(|m| m.range())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spliced {
    pub text: String,
    pub cursor: usize,
}

/// Replace the token at the cursor with `#name` followed by a single space,
/// leaving the cursor after that space. When whitespace already follows the
/// token it serves as the separator and no second space is inserted.
pub fn splice_suggestion(text: &str, cursor: usize, name: &str) -> Spliced {
    let (start, end) = token_range(text, cursor);
    let name = name.trim_start_matches('#');
    let after = &text[end..];

    let mut out = String::with_capacity(text.len() + name.len() + 2);
    out.push_str(&text[..start]);
    out.push('#');
    out.push_str(name);
    if !after.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    let cursor_byte = out.len()
        + after
            .chars()
            .next()
            .filter(|c| c.is_whitespace())
            .map_or(0, char::len_utf8);
    out.push_str(after);

    Spliced {
        cursor: byte_to_char(&out, cursor_byte),
        text: out,
    }
}

/// Result of re-evaluating the input after an edit or cursor move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionUpdate {
    /// Send this query; only its response will be accepted.
    Issue(SuggestionRequest),
    /// The active query did not change; keep waiting or showing results.
    Unchanged,
    /// No hashtag under the cursor; hide suggestions.
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub id: u64,
    pub query: String,
}

/// Drops suggestion responses that arrive for input that is no longer current.
#[derive(Debug, Default)]
pub struct SuggestionGuard {
    latest: u64,
    active: Option<String>,
}

impl SuggestionGuard {
    pub fn update(&mut self, text: &str, cursor: usize) -> SuggestionUpdate {
        match suggestion_query(text, cursor) {
            Some(query) if self.active.as_deref() == Some(query) => SuggestionUpdate::Unchanged,
            Some(query) => {
                self.latest += 1;
                self.active = Some(query.to_owned());
                SuggestionUpdate::Issue(SuggestionRequest {
                    id: self.latest,
                    query: query.to_owned(),
                })
            }
            None => {
                self.cancel();
                SuggestionUpdate::Clear
            }
        }
    }

    /// Whether a response for `id` still matches the current input.
    pub fn accepts(&self, id: u64) -> bool {
        self.active.is_some() && id == self.latest
    }

    /// Invalidate any outstanding request.
    pub fn cancel(&mut self) {
        if self.active.take().is_some() {
            self.latest += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARABIC: &str = "أحب #القاهرة اليوم";

    #[test]
    fn token_inside_arabic_tag() {
        assert_eq!(current_token(ARABIC, 10), "#القاهرة");
        assert_eq!(suggestion_query(ARABIC, 10), Some("القاهرة"));
    }

    #[test]
    fn token_ending_at_cursor() {
        assert_eq!(current_token("hello #ru", 9), "#ru");
        assert_eq!(current_token("hello #rust world", 11), "#rust");
    }

    #[test]
    fn no_token_after_whitespace() {
        assert_eq!(current_token("hello ", 6), "");
        assert_eq!(current_token("hello #rust", 6), "");
        assert_eq!(current_token("", 0), "");
    }

    #[test]
    fn cursor_past_end_is_clamped() {
        assert_eq!(current_token("#tag", 99), "#tag");
    }

    #[test]
    fn bare_hash_does_not_qualify() {
        assert_eq!(suggestion_query("hello #", 7), None);
        assert_eq!(suggestion_query("hello world", 11), None);
    }

    #[test]
    fn extract_dedupes_and_keeps_arabic() {
        let tags = extract_all_tags("أحب #القاهرة اليوم #القاهرة");
        assert_eq!(tags.len(), 1);
        assert!(tags.contains("#القاهرة"));

        let tags = extract_all_tags(ARABIC);
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["#القاهرة".to_string()]);
    }

    #[test]
    fn extract_mixed_scripts() {
        let tags = extract_all_tags("#rust and #tokio_rs, #rust! # alone");
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["#rust".to_string(), "#tokio_rs".to_string()]
        );
    }

    #[test]
    fn splice_replaces_token_and_adds_space() {
        let spliced = splice_suggestion("learning #ru", 12, "rust");
        assert_eq!(spliced.text, "learning #rust ");
        assert_eq!(spliced.cursor, 15);
    }

    #[test]
    fn splice_in_middle_reuses_following_space() {
        let spliced = splice_suggestion("a #ru b", 5, "rust");
        assert_eq!(spliced.text, "a #rust b");
        assert_eq!(spliced.cursor, 8);

        let spliced = splice_suggestion("#ru\nnext", 3, "rust");
        assert_eq!(spliced.text, "#rust\nnext");
        assert_eq!(spliced.cursor, 6);
    }

    #[test]
    fn splice_arabic() {
        let spliced = splice_suggestion("أحب #القا", 9, "القاهرة");
        assert_eq!(spliced.text, "أحب #القاهرة ");
        assert_eq!(spliced.cursor, 13);
    }

    #[test]
    fn guard_drops_stale_responses() {
        let mut guard = SuggestionGuard::default();
        let SuggestionUpdate::Issue(first) = guard.update("#r", 2) else {
            panic!("expected a request");
        };
        assert_eq!(first.query, "r");
        assert_eq!(guard.update("#r", 2), SuggestionUpdate::Unchanged);

        let SuggestionUpdate::Issue(second) = guard.update("#ru", 3) else {
            panic!("expected a request");
        };
        assert!(!guard.accepts(first.id));
        assert!(guard.accepts(second.id));

        assert_eq!(guard.update("#ru ", 4), SuggestionUpdate::Clear);
        assert!(!guard.accepts(second.id));
    }
}
