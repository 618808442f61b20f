//! Mutable document trees for annotation and cleanup passes.
//!
//! This crate provides:
//! - [`Document`]: an arena-backed element tree with own-text and tail slots
//! - [`parse`]: HTML (via `scraper`) and XML (via `quick-xml`) readers
//! - [`serialize`]: HTML and XML writers
//! - [`splice`]: tree surgery: [`wrap_text`], [`unwrap_element`], [`merge_adjacent`]
//! - [`select`]: region and candidate-text selection rules

pub mod parse;
pub mod select;
pub mod serialize;
pub mod splice;
pub mod tree;

pub use parse::{parse_html, parse_xml};
pub use select::{CandidateRule, RegionRule, TextPosition, select_candidates};
pub use serialize::{to_html_string, to_xml_string};
pub use splice::{merge_adjacent, remove_preserving_tail, unwrap_element, wrap_text};
pub use tree::{Document, NodeId, TextSlot, local_name};
