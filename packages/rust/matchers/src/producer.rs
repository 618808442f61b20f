//! Lazy match production over strings and paged text.

use std::collections::BTreeMap;

use regex::{Captures, Regex};

/// Form feed: the page separator in extracted text.
pub const PAGE_BREAK: char = '\x0C';

/// One occurrence of a pattern in a scanned string.
///
/// `start..end` are byte offsets into `string`, the exact string that was
/// scanned. Adjustments may shrink the range but never move it outside
/// `string`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch<'s> {
    pub start: usize,
    pub end: usize,
    /// Named groups that took part in the match.
    pub groups: BTreeMap<String, String>,
    pub string: &'s str,
}

impl<'s> TextMatch<'s> {
    fn from_captures(pattern: &Regex, caps: &Captures<'s>, string: &'s str) -> Self {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let groups = pattern
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();
        Self {
            start: whole.start,
            end: whole.end,
            groups,
            string,
        }
    }

    /// The matched text.
    pub fn text(&self) -> &'s str {
        let string: &'s str = self.string;
        &string[self.start..self.end]
    }

    pub fn group(&self, name: &str) -> Option<&str> {
        self.groups.get(name).map(String::as_str)
    }

    /// Drop the last `bytes` bytes from the match. No-op if that would cut
    /// into a character or past `start`.
    pub fn trim_end(&mut self, bytes: usize) {
        let Some(end) = self.end.checked_sub(bytes) else {
            return;
        };
        if end >= self.start && self.string.is_char_boundary(end) {
            self.end = end;
        }
    }

    /// Up to `chars` characters immediately before the match.
    pub fn prefix(&self, chars: usize) -> &'s str {
        let string: &'s str = self.string;
        let before = &string[..self.start];
        let cut = before
            .char_indices()
            .rev()
            .nth(chars.saturating_sub(1))
            .map_or(0, |(i, _)| i);
        if chars == 0 { "" } else { &before[cut..] }
    }

    /// Up to `chars` characters immediately after the match.
    pub fn suffix(&self, chars: usize) -> &'s str {
        let string: &'s str = self.string;
        let after = &string[self.end..];
        let cut = after.char_indices().nth(chars).map_or(after.len(), |(i, _)| i);
        &after[..cut]
    }
}

/// Non-overlapping matches of `pattern` in `text`, left to right.
///
/// Nothing is scanned until the iterator is driven.
pub fn find_matches<'r, 's>(
    pattern: &'r Regex,
    text: &'s str,
) -> impl Iterator<Item = TextMatch<'s>> + use<'r, 's> {
    pattern
        .captures_iter(text)
        .map(move |caps| TextMatch::from_captures(pattern, &caps, text))
}

/// Split extracted text into pages, numbered from zero.
pub fn pages(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split(PAGE_BREAK).enumerate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        Regex::new(r"(?P<word>[a-z]+)-(?P<num>\d+)").unwrap()
    }

    #[test]
    fn matches_are_ordered_and_bounded() {
        let re = pattern();
        let text = "see ab-1 and cd-22, also ef-333";
        let found: Vec<_> = find_matches(&re, text).collect();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].text(), "ab-1");
        assert_eq!((found[0].start, found[0].end), (4, 8));
        assert_eq!(found[1].group("num"), Some("22"));
        assert!(found.windows(2).all(|w| w[0].end <= w[1].start));
        assert!(found.iter().all(|m| m.start <= m.end && m.end <= text.len()));
    }

    #[test]
    fn absent_groups_are_left_out() {
        let re = Regex::new(r"x(?P<opt>y)?").unwrap();
        let found: Vec<_> = find_matches(&re, "x xy").collect();
        assert_eq!(found[0].group("opt"), None);
        assert_eq!(found[1].group("opt"), Some("y"));
    }

    #[test]
    fn lazy_iterator_can_stop_early() {
        let re = pattern();
        let mut iter = find_matches(&re, "a-1 b-2 c-3");
        assert_eq!(iter.next().map(|m| m.text()), Some("a-1"));
    }

    #[test]
    fn context_windows_count_characters() {
        let re = pattern();
        let text = "ééé ab-1 ü";
        let m = find_matches(&re, text).next().unwrap();
        assert_eq!(m.prefix(2), "é ");
        assert_eq!(m.prefix(30), "ééé ");
        assert_eq!(m.prefix(0), "");
        assert_eq!(m.suffix(1), " ");
        assert_eq!(m.suffix(30), " ü");
    }

    #[test]
    fn trim_end_respects_bounds() {
        let re = Regex::new(r"a\)").unwrap();
        let mut m = find_matches(&re, "a)").next().unwrap();
        m.trim_end(1);
        assert_eq!(m.text(), "a");
        m.trim_end(5);
        assert_eq!(m.text(), "a");
    }

    #[test]
    fn pages_split_on_form_feed() {
        let paged: Vec<_> = pages("one\x0Ctwo\x0C").collect();
        assert_eq!(paged, vec![(0, "one"), (1, "two"), (2, "")]);
    }
}
