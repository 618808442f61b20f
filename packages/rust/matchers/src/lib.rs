//! Pattern matching and markup over plain text and document trees.
//!
//! - [`producer`]: lazy, non-overlapping regex matches over a string or paged text
//! - [`engine`]: the tree scanner that splices annotation elements in place
//! - [`citations`]: citation flavors, href construction and the citation matcher

pub mod citations;
pub mod engine;
pub mod producer;

pub use citations::{CitationKind, CitationMatcher, TreeFlavor};
pub use engine::{DomRules, MarkMatcher, MatchHandler, markup_dom_matches};
pub use producer::{TextMatch, find_matches, pages};
