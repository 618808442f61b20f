//! Cosmetic cleanups for converted documents.
//!
//! Two of the passes work on raw markup text; the rest rewrite a parsed tree
//! in place. Each one is small and independent, and the pipeline in
//! `docpipe-core` decides which ones run and in what order.

use std::sync::LazyLock;

use quick_xml::escape::partial_escape;
use regex::Regex;
use tracing::{debug, warn};

use docpipe_dom::{Document, NodeId, remove_preserving_tail};
use docpipe_shared::Result;

// ---------------------------------------------------------------------------
// Pass: plain text to HTML
// ---------------------------------------------------------------------------

/// Wrap each line of plain text in an escaped `<p>`, inside a `<div>`.
pub fn text_to_html(text: &str) -> String {
    let mut html = String::from("<div>\n");
    for line in text.lines() {
        html.push_str("<p>");
        html.push_str(&partial_escape(line));
        html.push_str("</p>\n");
    }
    html.push_str("</div>");
    html
}

// ---------------------------------------------------------------------------
// Pass: whitespace in markup text
// ---------------------------------------------------------------------------

/// Turn `&nbsp;` into a space and collapse every whitespace run to one space.
pub fn normalise_whitespace(html: &str) -> String {
    static WHITESPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

    let html = html.replace("&nbsp;", " ");
    WHITESPACE_RE.replace_all(&html, " ").into_owned()
}

// ---------------------------------------------------------------------------
// Pass: strip whitespace inside blocks
// ---------------------------------------------------------------------------

/// Strip leading whitespace from the start of each block in `tags`, and
/// trailing whitespace from its end (the last child's tail, or its own text
/// when it has no children).
pub fn strip_whitespace<S: AsRef<str>>(doc: &mut Document, tags: &[S]) {
    for node in doc.find_all(doc.root(), tags) {
        let text = doc.text(node).trim_start().to_string();
        doc.set_text(node, text);
        match doc.last_child(node) {
            Some(last) => {
                let tail = doc.tail(last).trim_end().to_string();
                doc.set_tail(last, tail);
            }
            None => {
                let text = doc.text(node).trim_end().to_string();
                doc.set_text(node, text);
            }
        }
    }
}

/// Strip spaces and non-breaking spaces at the start of every `p`.
pub fn strip_para_whitespace(doc: &mut Document) {
    for p in doc.find_all(doc.root(), &["p"]) {
        let text = doc.text(p).trim_start_matches([' ', '\u{a0}']).to_string();
        doc.set_text(p, text);
    }
}

// ---------------------------------------------------------------------------
// Pass: merge consecutive lists
// ---------------------------------------------------------------------------

/// Fold each `ul` that directly follows another `ul` into it.
pub fn merge_ul(doc: &mut Document) -> Result<usize> {
    let mut merged = 0;
    for ul in doc.find_all(doc.root(), &["ul"]) {
        let Some(prev) = doc.previous_sibling(ul) else {
            continue;
        };
        if doc.tag(prev) != "ul" {
            continue;
        }
        let text = doc.text(ul).to_string();
        doc.append_text(prev, &text);
        for item in doc.children(ul).to_vec() {
            doc.append(prev, item);
        }
        remove_preserving_tail(doc, ul)?;
        merged += 1;
    }
    debug!(merged, "merged lists");
    Ok(merged)
}

// ---------------------------------------------------------------------------
// Pass: clean tables
// ---------------------------------------------------------------------------

/// Declarations dropped from cell styles outright.
const PADDING_PROPERTIES: &[&str] = &[
    "padding",
    "padding-top",
    "padding-bottom",
    "padding-left",
    "padding-right",
];

/// Declarations dropped from cell styles when set to `none`.
const BORDER_PROPERTIES: &[&str] = &[
    "border",
    "border-top",
    "border-bottom",
    "border-left",
    "border-right",
];

/// Tidy table markup:
///
/// - drop `width`, `cellpadding` and `cellspacing` on tables
/// - turn cell `width` attributes into a percentage of the row's total width
/// - drop padding from cell styles, and borders set to `none`
/// - drop cell `height`
pub fn clean_tables(doc: &mut Document) {
    for table in doc.find_all(doc.root(), &["table"]) {
        for attr in ["width", "cellpadding", "cellspacing"] {
            doc.remove_attr(table, attr);
        }
        for row in doc.find_all(table, &["tr"]) {
            clean_row(doc, row);
        }
    }
}

fn clean_row(doc: &mut Document, row: NodeId) {
    let cells = doc.children(row).to_vec();
    let total = cells
        .iter()
        .filter_map(|&c| cell_width(doc, c))
        .fold(0, u64::saturating_add);

    for cell in cells {
        let mut style = parse_style(doc.attr(cell, "style").unwrap_or_default());

        if let Some(width) = cell_width(doc, cell) {
            if total > 0 {
                let percent = width.saturating_mul(100) / total;
                set_property(&mut style, "width", format!("{percent}%"));
                doc.remove_attr(cell, "width");
            }
        } else if doc.attr(cell, "width").is_some() {
            warn!(width = doc.attr(cell, "width"), "ignoring unparseable cell width");
        }

        if !style.is_empty() {
            style.retain(|(name, value)| {
                !PADDING_PROPERTIES.contains(&name.as_str())
                    && !(BORDER_PROPERTIES.contains(&name.as_str()) && value == "none")
            });
            if style.is_empty() {
                doc.remove_attr(cell, "style");
            } else {
                doc.set_attr(cell, "style", write_style(&style));
            }
        }

        doc.remove_attr(cell, "height");
    }
}

/// A cell's `width` attribute as a number, ignoring a trailing `%`.
fn cell_width(doc: &Document, cell: NodeId) -> Option<u64> {
    doc.attr(cell, "width")?
        .trim()
        .trim_end_matches('%')
        .parse::<u32>()
        .ok()
        .map(u64::from)
}

/// `a: 1; b: 2` as ordered (property, value) pairs.
fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .collect()
}

fn set_property(style: &mut Vec<(String, String)>, name: &str, value: String) {
    match style.iter_mut().find(|(n, _)| n == name) {
        Some((_, v)) => *v = value,
        None => style.push((name.to_string(), value)),
    }
}

fn write_style(style: &[(String, String)]) -> String {
    style
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpipe_dom::{parse_html, to_html_string};

    #[test]
    fn text_becomes_escaped_paragraphs() {
        let text = "\none\n    two < three\n  four & five\n";
        assert_eq!(
            text_to_html(text),
            "<div>\n<p></p>\n<p>one</p>\n<p>    two &lt; three</p>\n<p>  four &amp; five</p>\n</div>"
        );
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(
            normalise_whitespace("<p>a&nbsp;b\r\n\t  c</p>\n<p>d</p>"),
            "<p>a b c</p> <p>d</p>"
        );
    }

    #[test]
    fn strip_block_whitespace() {
        let mut doc = parse_html(
            "\n<div>\n<h1> text <sup>a </sup></h1>\n<p> foo  </p>\n<p> <b>bold</b>  </p>\n</div>\n",
        )
        .unwrap();
        strip_whitespace(&mut doc, &["p", "h1"]);
        assert_eq!(
            to_html_string(&doc, doc.root()),
            "<div>\n<h1>text <sup>a </sup></h1>\n<p>foo</p>\n<p><b>bold</b></p>\n</div>"
        );
    }

    #[test]
    fn strip_para_leading_spaces_only() {
        let mut doc = parse_html("<div><p>\u{a0} lead <b>x</b> </p><h1> h</h1></div>").unwrap();
        strip_para_whitespace(&mut doc);
        assert_eq!(
            to_html_string(&doc, doc.root()),
            "<div><p>lead <b>x</b> </p><h1> h</h1></div>"
        );
    }

    #[test]
    fn consecutive_lists_merge() {
        let mut doc = parse_html(
            "<div><ul><li>a</li></ul><ul><li>b</li></ul>\n<ul><li>c</li></ul><p>x</p><ul><li>d</li></ul></div>",
        )
        .unwrap();
        assert_eq!(merge_ul(&mut doc).unwrap(), 2);
        assert_eq!(
            to_html_string(&doc, doc.root()),
            "<div><ul><li>a</li><li>b</li><li>c</li></ul>\n<p>x</p><ul><li>d</li></ul></div>"
        );
    }

    #[test]
    fn tables_are_tidied() {
        let mut doc = parse_html(concat!(
            r#"<div><table width="600" cellpadding="2" cellspacing="0"><tbody><tr>"#,
            r#"<td width="100" height="20" style="padding: 2px; border: none; color: red">a</td>"#,
            r#"<td width="300" style="border-top: 1px solid; padding-left: 3px">b</td>"#,
            r#"</tr></tbody></table></div>"#,
        ))
        .unwrap();
        clean_tables(&mut doc);
        assert_eq!(
            to_html_string(&doc, doc.root()),
            concat!(
                r#"<div><table><tbody><tr>"#,
                r#"<td style="color: red; width: 25%">a</td>"#,
                r#"<td style="border-top: 1px solid; width: 75%">b</td>"#,
                r#"</tr></tbody></table></div>"#,
            )
        );
    }

    #[test]
    fn huge_cell_widths_do_not_overflow() {
        let mut doc = parse_html(concat!(
            r#"<div><table><tbody>"#,
            r#"<tr><td width="50000000">a</td><td width="1">b</td></tr>"#,
            r#"<tr><td width="4000000000">c</td><td width="4000000000">d</td></tr>"#,
            r#"</tbody></table></div>"#,
        ))
        .unwrap();
        clean_tables(&mut doc);
        assert_eq!(
            to_html_string(&doc, doc.root()),
            concat!(
                r#"<div><table><tbody>"#,
                r#"<tr><td style="width: 99%">a</td><td style="width: 0%">b</td></tr>"#,
                r#"<tr><td style="width: 50%">c</td><td style="width: 50%">d</td></tr>"#,
                r#"</tbody></table></div>"#,
            )
        );
    }

    #[test]
    fn cell_style_emptied_is_removed() {
        let mut doc = parse_html(
            r#"<div><table><tbody><tr><td style="padding: 0; border-left: none">a</td><td style="">b</td></tr></tbody></table></div>"#,
        )
        .unwrap();
        clean_tables(&mut doc);
        assert_eq!(
            to_html_string(&doc, doc.root()),
            r#"<div><table><tbody><tr><td>a</td><td style="">b</td></tr></tbody></table></div>"#
        );
    }
}
