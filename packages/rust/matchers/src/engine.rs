//! The tree scanner.
//!
//! Candidate strings are kept on an explicit worklist of [`TextPosition`]s.
//! Splicing an annotation element shortens the string being scanned, so the
//! offsets of any later match in it go stale. After every splice the scanner
//! drops the old string and puts the new element's tail (the unscanned
//! remainder) at the front of the worklist instead. Positions queued earlier
//! refer to other strings, which a splice never touches.

use std::collections::VecDeque;

use regex::Regex;
use tracing::{debug, instrument};

use docpipe_dom::{
    CandidateRule, Document, NodeId, RegionRule, TextPosition, select_candidates, wrap_text,
};
use docpipe_shared::Result;

use crate::producer::{TextMatch, find_matches};

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Per-matcher behaviour plugged into [`markup_dom_matches`].
pub trait MatchHandler {
    /// Reshape a raw match before it is validated (e.g. trim over-matched
    /// punctuation).
    fn adjust<'s>(&self, m: TextMatch<'s>) -> TextMatch<'s> {
        m
    }

    /// Whether a match should be marked up. Invalid matches are skipped
    /// without touching the tree.
    fn is_valid(&self, _m: &TextMatch<'_>) -> bool {
        true
    }

    /// Create the detached annotation element for a valid match, or `None`
    /// to leave the text alone.
    fn marker(&mut self, doc: &mut Document, m: &TextMatch<'_>) -> Option<NodeId>;
}

/// Where to look in a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomRules {
    pub regions: RegionRule,
    pub candidates: CandidateRule,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Scan the candidate strings of `doc` in document order and splice an
/// annotation element around every valid match.
///
/// Returns the number of elements inserted.
#[instrument(skip_all, fields(pattern = pattern.as_str()))]
pub fn markup_dom_matches<H>(
    doc: &mut Document,
    pattern: &Regex,
    rules: &DomRules,
    handler: &mut H,
) -> Result<usize>
where
    H: MatchHandler + ?Sized,
{
    let mut worklist: VecDeque<TextPosition> =
        select_candidates(doc, &rules.regions, &rules.candidates).into();
    debug!(candidates = worklist.len(), "scanning tree");

    let mut inserted = 0;
    while let Some(position) = worklist.pop_front() {
        let source = doc.slot(position.node, position.slot).to_string();
        if source.is_empty() {
            continue;
        }
        if let Some(new_node) = splice_first_valid(doc, pattern, handler, position, &source)? {
            inserted += 1;
            worklist.push_front(TextPosition::tail(new_node));
        }
    }

    debug!(inserted, "tree scan complete");
    Ok(inserted)
}

/// Splice the first valid match in `source` (the current content of
/// `position`), returning the inserted element.
fn splice_first_valid<H>(
    doc: &mut Document,
    pattern: &Regex,
    handler: &mut H,
    position: TextPosition,
    source: &str,
) -> Result<Option<NodeId>>
where
    H: MatchHandler + ?Sized,
{
    for raw in find_matches(pattern, source) {
        let m = handler.adjust(raw);
        // an empty splice would leave the whole string in the new tail
        if m.start == m.end {
            continue;
        }
        if !handler.is_valid(&m) {
            debug!(text = m.text(), "skipping invalid match");
            continue;
        }
        let Some(marker) = handler.marker(doc, &m) else {
            continue;
        };
        let new_node = wrap_text(
            doc,
            position.node,
            position.slot,
            |_, _| marker,
            Some(m.start..m.end),
        )?;
        return Ok(Some(new_node));
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// MarkMatcher
// ---------------------------------------------------------------------------

/// Marks every match of a pattern with a plain element, `mark` by default.
#[derive(Debug, Clone)]
pub struct MarkMatcher {
    pub tag: String,
}

impl Default for MarkMatcher {
    fn default() -> Self {
        Self { tag: "mark".into() }
    }
}

impl MarkMatcher {
    /// Mark every match of `pattern` anywhere in the tree.
    pub fn markup(&mut self, doc: &mut Document, pattern: &Regex) -> Result<usize> {
        markup_dom_matches(doc, pattern, &DomRules::default(), self)
    }
}

impl MatchHandler for MarkMatcher {
    fn marker(&mut self, doc: &mut Document, _m: &TextMatch<'_>) -> Option<NodeId> {
        Some(doc.create_element(&self.tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpipe_dom::{parse_html, parse_xml, to_html_string, to_xml_string};

    /// Only accepts matches whose digits are even.
    struct EvenOnly;

    impl MatchHandler for EvenOnly {
        fn is_valid(&self, m: &TextMatch<'_>) -> bool {
            m.text().parse::<u32>().is_ok_and(|n| n % 2 == 0)
        }

        fn marker(&mut self, doc: &mut Document, _m: &TextMatch<'_>) -> Option<NodeId> {
            Some(doc.create_element("even"))
        }
    }

    #[test]
    fn marks_every_match_in_text_and_tails() {
        let mut doc = parse_html("<p>x 1 y <b>2 z 3</b> w 4 v 5</p>").unwrap();
        let digits = Regex::new(r"\d").unwrap();
        let count = MarkMatcher::default().markup(&mut doc, &digits).unwrap();
        assert_eq!(count, 5);
        assert_eq!(
            to_html_string(&doc, doc.root()),
            "<p>x <mark>1</mark> y <b><mark>2</mark> z <mark>3</mark></b> w <mark>4</mark> v <mark>5</mark></p>"
        );
    }

    #[test]
    fn empty_matches_are_never_spliced() {
        let mut doc = parse_html("<p>a1b<i>c</i>22</p>").unwrap();
        let digits = Regex::new(r"\d*").unwrap();
        let count = MarkMatcher::default().markup(&mut doc, &digits).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            to_html_string(&doc, doc.root()),
            "<p>a<mark>1</mark>b<i>c</i><mark>22</mark></p>"
        );
    }

    #[test]
    fn text_content_is_preserved() {
        let input = "<div><p>a1b2c3</p>9<i>88</i>7</div>";
        let mut doc = parse_html(input).unwrap();
        let before = doc.text_content(doc.root());
        let digits = Regex::new(r"\d").unwrap();
        let count = MarkMatcher::default().markup(&mut doc, &digits).unwrap();
        assert_eq!(count, 7);
        assert_eq!(doc.text_content(doc.root()), before);
        assert_eq!(doc.find_all(doc.root(), &["mark"]).len(), 7);
    }

    #[test]
    fn invalid_matches_leave_text_untouched() {
        let mut doc = parse_html("<p>1 2 3 4</p>").unwrap();
        let digits = Regex::new(r"\d").unwrap();
        let count = markup_dom_matches(&mut doc, &digits, &DomRules::default(), &mut EvenOnly)
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            to_html_string(&doc, doc.root()),
            "<p>1 <even>2</even> 3 <even>4</even></p>"
        );
    }

    #[test]
    fn regions_and_exclusions_apply() {
        let mut doc = parse_xml("<doc><meta>7</meta><body>1 <ref>2</ref> 3</body></doc>").unwrap();
        let rules = DomRules {
            regions: RegionRule::tags(["body"]),
            candidates: CandidateRule::default().excluding(["ref"]),
        };
        let digits = Regex::new(r"\d").unwrap();
        let mut marker = MarkMatcher { tag: "ref".into() };
        let count = markup_dom_matches(&mut doc, &digits, &rules, &mut marker).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            to_xml_string(&doc, doc.root()),
            "<doc><meta>7</meta><body><ref>1</ref> <ref>2</ref> <ref>3</ref></body></doc>"
        );
    }

    #[test]
    fn second_run_finds_nothing_new() {
        let mut doc = parse_xml("<doc><body>1 2</body></doc>").unwrap();
        let rules = DomRules {
            regions: RegionRule::default(),
            candidates: CandidateRule::default().excluding(["ref"]),
        };
        let digits = Regex::new(r"\d").unwrap();
        let mut marker = MarkMatcher { tag: "ref".into() };
        assert_eq!(markup_dom_matches(&mut doc, &digits, &rules, &mut marker).unwrap(), 2);
        assert_eq!(markup_dom_matches(&mut doc, &digits, &rules, &mut marker).unwrap(), 0);
    }
}
