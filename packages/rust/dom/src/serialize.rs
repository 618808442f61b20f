//! Markup writers.
//!
//! Output is the element itself (without its tail) with children and their
//! tails written in order. Character data is escaped with `quick-xml`'s
//! escaping helpers: `&`, `<`, `>` in text, and quotes too in attributes.

use quick_xml::escape::{escape, partial_escape};

use crate::tree::{Document, NodeId, local_name};

/// HTML elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Html,
    Xml,
}

/// Serialize an element as HTML (`<br>`, `<b></b>`).
pub fn to_html_string(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_element(doc, id, Syntax::Html, &mut out);
    out
}

/// Serialize an element as XML (`<br/>`).
pub fn to_xml_string(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_element(doc, id, Syntax::Xml, &mut out);
    out
}

fn write_element(doc: &Document, id: NodeId, syntax: Syntax, out: &mut String) {
    let tag = doc.tag(id);
    out.push('<');
    out.push_str(tag);
    for (name, value) in doc.attrs(id) {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    let children = doc.children(id);
    let text = doc.text(id);
    let is_empty = children.is_empty() && text.is_empty();

    match syntax {
        Syntax::Html if VOID_ELEMENTS.contains(&local_name(tag)) && is_empty => {
            out.push('>');
            return;
        }
        Syntax::Xml if is_empty => {
            out.push_str("/>");
            return;
        }
        _ => out.push('>'),
    }

    out.push_str(&partial_escape(text));
    for &child in children {
        write_element(doc, child, syntax, out);
        out.push_str(&partial_escape(doc.tail(child)));
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_html, parse_xml};

    #[test]
    fn html_roundtrip_keeps_whitespace() {
        let input = "<div>\n<p>one <b>two</b> three<br>four</p>\n</div>";
        let doc = parse_html(input).unwrap();
        assert_eq!(to_html_string(&doc, doc.root()), input);
    }

    #[test]
    fn html_escapes_text_and_attributes() {
        let mut doc = Document::new("p");
        let root = doc.root();
        doc.set_text(root, "a < b & c");
        doc.set_attr(root, "title", "say \"hi\"");
        assert_eq!(
            to_html_string(&doc, root),
            "<p title=\"say &quot;hi&quot;\">a &lt; b &amp; c</p>"
        );
    }

    #[test]
    fn html_empty_non_void_keeps_end_tag() {
        let doc = parse_html("<p><b></b>x</p>").unwrap();
        assert_eq!(to_html_string(&doc, doc.root()), "<p><b></b>x</p>");
    }

    #[test]
    fn xml_self_closes_empty_elements() {
        let input = r#"<root xmlns="urn:x"><p eId="p_1">a<br/>b</p><empty/></root>"#;
        let doc = parse_xml(input).unwrap();
        assert_eq!(to_xml_string(&doc, doc.root()), input);
    }
}
