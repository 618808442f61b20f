//! Citation flavors and the citation matcher.
//!
//! A [`CitationKind`] bundles a pattern, an href template and the
//! flavor-specific normalization applied before the template is filled.
//! [`CitationMatcher`] runs one kind over plain text or a tree and collects
//! an [`ExtractedCitation`] for every valid match.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use docpipe_dom::{CandidateRule, Document, NodeId, RegionRule};
use docpipe_shared::{CitationsConfig, DocpipeError, ExtractedCitation, FrbrUri, Result};

use crate::engine::{DomRules, MatchHandler, markup_dom_matches};
use crate::producer::{TextMatch, find_matches, pages};

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// `ACHPR/Res.227 (LII) 2012`, `ACHPR/Res. 437 (EXT.OS/ XXVI1) 2020`,
/// `ACHPR/Res.79 (XXXVIII) 05`
static ACHPR_RESOLUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        \bACHPR/Res\.?\s*
        (?P<num>\d+)\s*
        \((EXT\.\s*OS\s*/\s*)?[XVILC1]+\)\s*
        (?P<year>\d{2,4})
        ",
    )
    .expect("achpr resolution regex")
});

/// `Act 5 of 2019`, `Act No. 3 of 1992`, `Income Tax Act, 1962 (No 58 of 1962)`
static ACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        \bAct,?\s*
        ((19|20)\d{2}\s*)?
        \(?
        (?P<ref>
          ([no\.]*\s*)?
          (?P<num>\d+)\s*
          of\s*
          (?P<year>\d{4})
        )\)?
        ",
    )
    .expect("act regex")
});

/// `{name}` placeholders in href templates.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder regex"));

/// Section elements of an Akoma Ntoso document that carry citable prose.
const XML_REGIONS: &[&str] = &[
    "coverpage",
    "preface",
    "preamble",
    "body",
    "mainBody",
    "portionBody",
    "judgmentBody",
    "conclusions",
];

// ---------------------------------------------------------------------------
// CitationKind
// ---------------------------------------------------------------------------

/// The citation grammars the matcher knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    /// Resolutions of the African Commission on Human and Peoples' Rights.
    AchprResolution,
    /// Acts of the document's own jurisdiction.
    Act,
}

impl CitationKind {
    pub const ALL: [CitationKind; 2] = [Self::AchprResolution, Self::Act];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AchprResolution => "achpr",
            Self::Act => "act",
        }
    }

    pub fn pattern(&self) -> &'static Regex {
        match self {
            Self::AchprResolution => &ACHPR_RESOLUTION_RE,
            Self::Act => &ACT_RE,
        }
    }

    pub fn href_template(&self) -> &'static str {
        match self {
            Self::AchprResolution => "/akn/aa-au/statement/resolution/achpr/{year}/{num}",
            Self::Act => "/akn/{juri}/act/{year}/{num}",
        }
    }

    /// Literal every candidate string must contain before it is scanned.
    pub fn needle(&self) -> &'static str {
        match self {
            Self::AchprResolution => "ACHPR",
            Self::Act => "Act",
        }
    }

    /// Correct a raw match before validation.
    ///
    /// The act grammar's optional brackets can swallow a `)` that belongs to
    /// the surrounding prose; such a match loses its last character.
    pub fn adjust<'s>(&self, mut m: TextMatch<'s>) -> TextMatch<'s> {
        if *self == Self::Act {
            let text = m.text();
            if text.ends_with(')') && !text.contains('(') {
                m.trim_end(1);
            }
        }
        m
    }

    /// Template arguments for a match: its named groups after normalization.
    pub fn href_args(&self, m: &TextMatch<'_>, frbr_uri: &FrbrUri) -> BTreeMap<String, String> {
        let mut args = m.groups.clone();
        match self {
            Self::AchprResolution => {
                if let Some(year) = args.get_mut("year") {
                    *year = expand_year(year);
                }
            }
            Self::Act => {
                args.entry("juri".into())
                    .or_insert_with(|| frbr_uri.country.clone());
            }
        }
        args
    }

    /// The target identifier for a match, if every placeholder can be filled.
    pub fn make_href(&self, m: &TextMatch<'_>, frbr_uri: &FrbrUri) -> Option<String> {
        fill_template(self.href_template(), &self.href_args(m, frbr_uri))
    }

    /// A valid match has an href that does not point back at the document.
    pub fn valid_href(&self, m: &TextMatch<'_>, frbr_uri: &FrbrUri) -> Option<String> {
        self.make_href(m, frbr_uri)
            .filter(|href| *href != frbr_uri.work_uri())
    }

    /// Scan rules for this kind in the given tree flavor.
    pub fn dom_rules(&self, flavor: TreeFlavor) -> DomRules {
        DomRules {
            regions: flavor.regions(),
            candidates: CandidateRule::containing(self.needle()).excluding([flavor.marker_tag()]),
        }
    }
}

impl fmt::Display for CitationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CitationKind {
    type Err = DocpipeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "achpr" | "achpr_resolution" | "achpr-resolution" => Ok(Self::AchprResolution),
            "act" => Ok(Self::Act),
            other => Err(DocpipeError::validation(format!(
                "unknown citation kind {other:?} (expected one of: achpr, act)"
            ))),
        }
    }
}

/// Two-digit years are read as 1981–2080.
pub fn expand_year(year: &str) -> String {
    match year.parse::<u32>() {
        Ok(y) if y < 100 && y > 80 => (1900 + y).to_string(),
        Ok(y) if y < 100 => (2000 + y).to_string(),
        _ => year.to_string(),
    }
}

/// Substitute `{name}` placeholders. `None` if any placeholder has no value.
pub fn fill_template(template: &str, args: &BTreeMap<String, String>) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let whole = caps.get(0)?;
        let value = args.get(&caps[1])?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Some(out)
}

// ---------------------------------------------------------------------------
// TreeFlavor
// ---------------------------------------------------------------------------

/// The two kinds of tree a matcher can annotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeFlavor {
    Html,
    Xml,
}

impl TreeFlavor {
    /// Local name of the inserted annotation element.
    pub fn marker_tag(&self) -> &'static str {
        match self {
            Self::Html => "a",
            Self::Xml => "ref",
        }
    }

    pub fn regions(&self) -> RegionRule {
        match self {
            Self::Html => RegionRule::whole_root(),
            Self::Xml => RegionRule::tags(XML_REGIONS.iter().copied()),
        }
    }

    /// The marker tag written with the root element's namespace prefix, if any.
    fn qualified_marker_tag(&self, doc: &Document) -> String {
        match (self, doc.tag(doc.root()).split_once(':')) {
            (Self::Xml, Some((prefix, _))) => format!("{prefix}:{}", self.marker_tag()),
            _ => self.marker_tag().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// CitationMatcher
// ---------------------------------------------------------------------------

/// Finds citations of one kind and records them.
///
/// Each top-level call clears the previous results, so an instance can be
/// reused for document after document but not shared between two calls
/// running at once.
#[derive(Debug, Clone)]
pub struct CitationMatcher {
    kind: CitationKind,
    prefix_length: usize,
    suffix_length: usize,
    citations: Vec<ExtractedCitation>,
}

impl CitationMatcher {
    pub fn new(kind: CitationKind) -> Self {
        Self::with_config(kind, &CitationsConfig::default())
    }

    pub fn with_config(kind: CitationKind, config: &CitationsConfig) -> Self {
        Self {
            kind,
            prefix_length: config.prefix_length,
            suffix_length: config.suffix_length,
            citations: Vec::new(),
        }
    }

    pub fn kind(&self) -> CitationKind {
        self.kind
    }

    /// Citations found by the last call.
    pub fn citations(&self) -> &[ExtractedCitation] {
        &self.citations
    }

    pub fn into_citations(self) -> Vec<ExtractedCitation> {
        self.citations
    }

    /// Extract citations from plain text, page by page.
    ///
    /// Offsets are local to each form-feed separated page; every citation
    /// carries its page index and a few characters of context either side.
    #[instrument(skip_all, fields(kind = %self.kind, frbr_uri = %frbr_uri))]
    pub fn extract_text_matches(&mut self, frbr_uri: &FrbrUri, text: &str) -> &[ExtractedCitation] {
        self.citations.clear();
        for (page, content) in pages(text) {
            for raw in find_matches(self.kind.pattern(), content) {
                let m = self.kind.adjust(raw);
                let Some(href) = self.kind.valid_href(&m, frbr_uri) else {
                    debug!(text = m.text(), page, "skipping citation without a usable href");
                    continue;
                };
                self.citations.push(ExtractedCitation {
                    text: m.text().to_string(),
                    start: m.start,
                    end: m.end,
                    href,
                    page: Some(page),
                    prefix: Some(m.prefix(self.prefix_length).to_string()),
                    suffix: Some(m.suffix(self.suffix_length).to_string()),
                });
            }
        }
        info!(count = self.citations.len(), "extracted citations from text");
        &self.citations
    }

    /// Mark up citations in an HTML tree with `<a href>` elements.
    pub fn markup_html_matches(
        &mut self,
        frbr_uri: &FrbrUri,
        doc: &mut Document,
    ) -> Result<&[ExtractedCitation]> {
        self.markup_tree_matches(frbr_uri, doc, TreeFlavor::Html)
    }

    /// Mark up citations in an Akoma Ntoso tree with `<ref href>` elements.
    pub fn markup_xml_matches(
        &mut self,
        frbr_uri: &FrbrUri,
        doc: &mut Document,
    ) -> Result<&[ExtractedCitation]> {
        self.markup_tree_matches(frbr_uri, doc, TreeFlavor::Xml)
    }

    #[instrument(skip_all, fields(kind = %self.kind, frbr_uri = %frbr_uri, flavor = ?flavor))]
    pub fn markup_tree_matches(
        &mut self,
        frbr_uri: &FrbrUri,
        doc: &mut Document,
        flavor: TreeFlavor,
    ) -> Result<&[ExtractedCitation]> {
        self.citations.clear();
        let rules = self.kind.dom_rules(flavor);
        let mut handler = CitationHandler {
            kind: self.kind,
            frbr_uri,
            marker_tag: flavor.qualified_marker_tag(doc),
            citations: &mut self.citations,
        };
        markup_dom_matches(doc, self.kind.pattern(), &rules, &mut handler)?;
        info!(count = self.citations.len(), "marked up citations");
        Ok(&self.citations)
    }
}

/// Per-call state for tree markup.
struct CitationHandler<'a> {
    kind: CitationKind,
    frbr_uri: &'a FrbrUri,
    marker_tag: String,
    citations: &'a mut Vec<ExtractedCitation>,
}

impl MatchHandler for CitationHandler<'_> {
    fn adjust<'s>(&self, m: TextMatch<'s>) -> TextMatch<'s> {
        self.kind.adjust(m)
    }

    fn is_valid(&self, m: &TextMatch<'_>) -> bool {
        self.kind.valid_href(m, self.frbr_uri).is_some()
    }

    fn marker(&mut self, doc: &mut Document, m: &TextMatch<'_>) -> Option<NodeId> {
        let href = self.kind.valid_href(m, self.frbr_uri)?;
        let marker = doc.create_element(&self.marker_tag);
        doc.set_attr(marker, "href", href.as_str());
        self.citations.push(ExtractedCitation {
            text: m.text().to_string(),
            start: m.start,
            end: m.end,
            href,
            page: None,
            prefix: None,
            suffix: None,
        });
        Some(marker)
    }
}
