//! Declarative selection of scan regions and candidate text positions.
//!
//! A [`RegionRule`] picks the subtrees to scan; a [`CandidateRule`] picks
//! the text positions inside them. Positions come out in document order:
//! an element's own text, then for each child the child's positions followed
//! by the child's tail.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::tree::{Document, NodeId, TextSlot};

/// A string slot on a specific element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPosition {
    pub node: NodeId,
    pub slot: TextSlot,
}

impl TextPosition {
    pub fn text(node: NodeId) -> Self {
        Self { node, slot: TextSlot::Text }
    }

    pub fn tail(node: NodeId) -> Self {
        Self { node, slot: TextSlot::Tail }
    }

    /// The element that contains this text: the node itself for own text,
    /// the node's parent for a tail.
    pub fn container(&self, doc: &Document) -> Option<NodeId> {
        match self.slot {
            TextSlot::Text => Some(self.node),
            TextSlot::Tail => doc.parent(self.node),
        }
    }
}

/// Which subtrees to scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRule {
    /// Element local names that start a region. Empty means the whole tree.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RegionRule {
    pub fn whole_root() -> Self {
        Self::default()
    }

    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Region roots in document order. Nested regions are all returned.
    pub fn select(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        if self.tags.is_empty() {
            vec![root]
        } else {
            doc.find_all(root, &self.tags)
        }
    }
}

/// Which text positions inside a region are worth scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRule {
    /// Only strings containing this literal are kept.
    #[serde(default)]
    pub contains: Option<String>,
    /// Text inside any element with one of these local names is skipped.
    #[serde(default)]
    pub exclude_ancestors: Vec<String>,
}

impl CandidateRule {
    pub fn containing(needle: impl Into<String>) -> Self {
        Self {
            contains: Some(needle.into()),
            exclude_ancestors: Vec::new(),
        }
    }

    pub fn excluding<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_ancestors.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Whether a single position passes the rule right now.
    pub fn accepts(&self, doc: &Document, position: TextPosition) -> bool {
        let text = doc.slot(position.node, position.slot);
        if text.is_empty() {
            return false;
        }
        if let Some(needle) = &self.contains {
            if !text.contains(needle.as_str()) {
                return false;
            }
        }
        if self.exclude_ancestors.is_empty() {
            return true;
        }
        let Some(container) = position.container(doc) else {
            return true;
        };
        !std::iter::once(container)
            .chain(doc.ancestors(container))
            .any(|n| doc.has_tag_in(n, &self.exclude_ancestors))
    }

    /// Candidate positions within one region, in document order.
    pub fn select(&self, doc: &Document, region: NodeId) -> Vec<TextPosition> {
        let mut out = Vec::new();
        self.collect(doc, region, &mut out);
        out
    }

    fn collect(&self, doc: &Document, element: NodeId, out: &mut Vec<TextPosition>) {
        let own = TextPosition::text(element);
        if self.accepts(doc, own) {
            out.push(own);
        }
        for &child in doc.children(element) {
            self.collect(doc, child, out);
            let tail = TextPosition::tail(child);
            if self.accepts(doc, tail) {
                out.push(tail);
            }
        }
    }
}

/// Candidates across every region, each position listed once even when
/// regions nest.
pub fn select_candidates(
    doc: &Document,
    regions: &RegionRule,
    candidates: &CandidateRule,
) -> Vec<TextPosition> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for region in regions.select(doc, doc.root()) {
        for position in candidates.select(doc, region) {
            if seen.insert(position) {
                out.push(position);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_html, parse_xml};

    fn texts(doc: &Document, positions: &[TextPosition]) -> Vec<String> {
        positions
            .iter()
            .map(|p| doc.slot(p.node, p.slot).to_string())
            .collect()
    }

    #[test]
    fn document_order_with_tails() {
        let doc = parse_html("<div>a<p>b<b>c</b>d</p>e</div>").unwrap();
        let found = select_candidates(&doc, &RegionRule::whole_root(), &CandidateRule::default());
        assert_eq!(texts(&doc, &found), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn needle_and_excluded_ancestors() {
        let doc = parse_html(
            r#"<div><p>Act 1 of 2000 <a href="x">Act 2 of 2000 <i>Act</i></a> Act tail</p></div>"#,
        )
        .unwrap();
        let rule = CandidateRule::containing("Act").excluding(["a"]);
        let found = select_candidates(&doc, &RegionRule::whole_root(), &rule);
        // the a element's tail sits in the paragraph, so it still counts
        assert_eq!(texts(&doc, &found), vec!["Act 1 of 2000 ", " Act tail"]);
    }

    #[test]
    fn regions_limit_scope_and_nesting_dedupes() {
        let doc = parse_xml(
            "<akomaNtoso><meta>ACHPR</meta><body>ACHPR one<mainBody>ACHPR two</mainBody></body></akomaNtoso>",
        )
        .unwrap();
        let regions = RegionRule::tags(["body", "mainBody"]);
        let found = select_candidates(&doc, &regions, &CandidateRule::containing("ACHPR"));
        assert_eq!(texts(&doc, &found), vec!["ACHPR one", "ACHPR two"]);
    }

    #[test]
    fn region_tail_outside_region_is_skipped() {
        let doc = parse_xml("<root><body>x</body>ACHPR</root>").unwrap();
        let found = select_candidates(
            &doc,
            &RegionRule::tags(["body"]),
            &CandidateRule::containing("ACHPR"),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn rules_deserialize() {
        let rule: CandidateRule =
            serde_json::from_str(r#"{"contains": "Act", "exclude_ancestors": ["ref"]}"#).unwrap();
        assert_eq!(rule, CandidateRule::containing("Act").excluding(["ref"]));
    }
}
