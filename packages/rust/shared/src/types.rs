//! Core domain types: document identity and extracted citations.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DocpipeError, Result};

// ---------------------------------------------------------------------------
// FrbrUri
// ---------------------------------------------------------------------------

/// Matches the date component of a work identifier (`2021`, `2021-03`, `2021-03-04`).
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}(-\d{2}(-\d{2})?)?$").expect("date regex"));

/// Structured identity of the document being processed.
///
/// Parsed from Akoma Ntoso style identifiers such as
/// `/akn/za/act/1962/58` or `/akn/aa-au/statement/resolution/achpr/2021/509`.
/// Anything after the work number (language, expression date) is accepted
/// and ignored by [`FrbrUri::work_uri`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrbrUri {
    /// Two-letter country (or regional body) code.
    pub country: String,
    /// Optional locality within the country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    /// Document type (`act`, `statement`, `judgment`, ...).
    pub doctype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Work date, as written in the identifier.
    pub date: String,
    /// Work number.
    pub number: String,
}

impl FrbrUri {
    /// Parse an identifier string.
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid =
            |why: &str| DocpipeError::validation(format!("invalid FRBR URI {uri:?}: {why}"));

        let mut parts = uri.trim().trim_matches('/').split('/');
        if parts.next() != Some("akn") {
            return Err(invalid("must start with /akn/"));
        }

        let jurisdiction = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| invalid("missing jurisdiction"))?;
        let (country, locality) = match jurisdiction.split_once('-') {
            Some((c, l)) => (c.to_string(), Some(l.to_string())),
            None => (jurisdiction.to_string(), None),
        };

        let doctype = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| invalid("missing doctype"))?;

        // up to two components (subtype, actor) sit between the doctype and the date
        let mut between = Vec::new();
        let date = loop {
            match parts.next() {
                Some(p) if DATE_RE.is_match(p) => break p.to_string(),
                Some(p) if between.len() < 2 => between.push(p.to_string()),
                Some(_) => return Err(invalid("too many components before the date")),
                None => return Err(invalid("missing date")),
            }
        };
        let number = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| invalid("missing number"))?;

        let mut between = between.into_iter();
        Ok(Self {
            country,
            locality,
            doctype: doctype.to_string(),
            subtype: between.next(),
            actor: between.next(),
            date,
            number: number.to_string(),
        })
    }

    /// The jurisdiction component: country plus optional locality.
    pub fn place(&self) -> String {
        match &self.locality {
            Some(locality) => format!("{}-{locality}", self.country),
            None => self.country.clone(),
        }
    }

    /// Canonical work identifier, used for self-citation checks.
    pub fn work_uri(&self) -> String {
        let mut uri = format!("/akn/{}/{}", self.place(), self.doctype);
        for part in [&self.subtype, &self.actor].into_iter().flatten() {
            uri.push('/');
            uri.push_str(part);
        }
        uri.push_str(&format!("/{}/{}", self.date, self.number));
        uri
    }
}

impl std::fmt::Display for FrbrUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.work_uri())
    }
}

impl std::str::FromStr for FrbrUri {
    type Err = DocpipeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// ExtractedCitation
// ---------------------------------------------------------------------------

/// A validated citation found in a document.
///
/// `start`/`end` are byte offsets into the exact string that was scanned:
/// a page of plain text, or an own-text/tail string of a tree node.
/// `page`, `prefix` and `suffix` are only recorded in plain-text mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCitation {
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Target work identifier.
    pub href: String,
    /// Zero-based page index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_subtype_and_actor() {
        let uri = FrbrUri::parse("/akn/aa-au/statement/resolution/achpr/2021/509").unwrap();
        assert_eq!(uri.country, "aa");
        assert_eq!(uri.locality.as_deref(), Some("au"));
        assert_eq!(uri.doctype, "statement");
        assert_eq!(uri.subtype.as_deref(), Some("resolution"));
        assert_eq!(uri.actor.as_deref(), Some("achpr"));
        assert_eq!(uri.date, "2021");
        assert_eq!(uri.number, "509");
        assert_eq!(uri.work_uri(), "/akn/aa-au/statement/resolution/achpr/2021/509");
    }

    #[test]
    fn work_uri_drops_expression_parts() {
        let uri: FrbrUri = "/akn/za/act/1962/58/eng@2010-01-01".parse().unwrap();
        assert_eq!(uri.country, "za");
        assert_eq!(uri.locality, None);
        assert_eq!(uri.work_uri(), "/akn/za/act/1962/58");
    }

    #[test]
    fn parse_full_date_and_single_subtype() {
        let uri = FrbrUri::parse("/akn/za-cpt/act/by-law/2003-09-12/public-health").unwrap();
        assert_eq!(uri.place(), "za-cpt");
        assert_eq!(uri.subtype.as_deref(), Some("by-law"));
        assert_eq!(uri.actor, None);
        assert_eq!(uri.to_string(), "/akn/za-cpt/act/by-law/2003-09-12/public-health");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(FrbrUri::parse("/foo/za/act/2020/1").is_err());
        assert!(FrbrUri::parse("/akn/za/act/2020").is_err());
        assert!(FrbrUri::parse("/akn/za/act/a/b/c/2020/1").is_err());
        assert!(FrbrUri::parse("/akn").is_err());
    }

    #[test]
    fn citation_serializes_without_empty_context() {
        let citation = ExtractedCitation {
            text: "Act 5 of 2019".into(),
            start: 4,
            end: 17,
            href: "/akn/za/act/2019/5".into(),
            page: None,
            prefix: None,
            suffix: None,
        };
        let json = serde_json::to_string(&citation).expect("serialize");
        assert!(!json.contains("prefix"));
        assert!(json.contains("\"href\":\"/akn/za/act/2019/5\""));
    }
}
