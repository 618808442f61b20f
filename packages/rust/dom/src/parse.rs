//! Markup readers: HTML through `scraper` (html5ever), XML through `quick-xml`.
//!
//! Both build a [`Document`], folding character data into the own-text or
//! tail slot of the element it follows. Comments, doctypes and processing
//! instructions are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use docpipe_shared::{DocpipeError, Result};

use crate::tree::{Document, NodeId};

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

/// Parse HTML into a tree.
///
/// Full documents (with `<html>` or `<body>`) are rooted at `html`.
/// A fragment with a single top-level element is rooted at that element;
/// any other fragment is wrapped in a `div`.
pub fn parse_html(html: &str) -> Result<Document> {
    let lowered = html.to_ascii_lowercase();
    if lowered.contains("<html") || lowered.contains("<body") {
        let parsed = Html::parse_document(html);
        return Ok(document_from_element(parsed.root_element()));
    }

    let parsed = Html::parse_fragment(html);
    let container = parsed.root_element();

    let mut elements = container
        .children()
        .filter(|c| matches!(c.value(), Node::Element(_)));
    let only_element = match (elements.next(), elements.next()) {
        (Some(el), None) => Some(el),
        _ => None,
    };
    let stray_text = container.children().any(|c| match c.value() {
        Node::Text(text) => !text.trim().is_empty(),
        _ => false,
    });

    if let (Some(el), false) = (only_element.and_then(ElementRef::wrap), stray_text) {
        return Ok(document_from_element(el));
    }

    debug!("wrapping multi-root html fragment in a div");
    let mut doc = Document::new("div");
    let root = doc.root();
    copy_html_children(&mut doc, root, container);
    Ok(doc)
}

fn document_from_element(element: ElementRef<'_>) -> Document {
    let mut doc = Document::new(element.value().name());
    let root = doc.root();
    copy_html_attrs(&mut doc, root, element);
    copy_html_children(&mut doc, root, element);
    doc
}

fn copy_html_attrs(doc: &mut Document, id: NodeId, element: ElementRef<'_>) {
    for (name, value) in element.value().attrs() {
        doc.set_attr(id, name, value);
    }
}

fn copy_html_children(doc: &mut Document, parent: NodeId, element: ElementRef<'_>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => doc.append_text(parent, text),
            Node::Element(data) => {
                let id = doc.create_element(data.name());
                doc.append(parent, id);
                if let Some(child_el) = ElementRef::wrap(child) {
                    copy_html_attrs(doc, id, child_el);
                    copy_html_children(doc, id, child_el);
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// XML
// ---------------------------------------------------------------------------

/// Parse a well-formed XML document into a tree.
///
/// Whitespace is kept exactly; namespace declarations stay as ordinary
/// attributes and prefixed names are kept as written.
pub fn parse_xml(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);

    let mut doc: Option<Document> = None;
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let id = open_xml_element(&mut doc, &stack, &e)?;
                stack.push(id);
            }
            Ok(Event::Empty(e)) => {
                open_xml_element(&mut doc, &stack, &e)?;
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| DocpipeError::parse(format!("bad character data: {e}")))?;
                if let (Some(doc), Some(&top)) = (doc.as_mut(), stack.last()) {
                    doc.append_text(top, &text);
                }
            }
            Ok(Event::CData(e)) => {
                let raw = e.into_inner();
                if let (Some(doc), Some(&top)) = (doc.as_mut(), stack.last()) {
                    doc.append_text(top, &String::from_utf8_lossy(&raw));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DocpipeError::parse(format!(
                    "XML parse error at position {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DocpipeError::parse("unexpected end of XML: unclosed elements"));
    }
    doc.ok_or_else(|| DocpipeError::parse("XML input has no root element"))
}

fn open_xml_element(
    doc: &mut Option<Document>,
    stack: &[NodeId],
    start: &BytesStart<'_>,
) -> Result<NodeId> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let id = if let Some(existing) = doc.as_mut() {
        let parent = stack.last().copied().ok_or_else(|| {
            DocpipeError::parse(format!("unexpected second root element <{name}>"))
        })?;
        let id = existing.create_element(&name);
        existing.append(parent, id);
        id
    } else {
        let created = Document::new(&name);
        let root = created.root();
        *doc = Some(created);
        root
    };

    let doc = doc
        .as_mut()
        .ok_or_else(|| DocpipeError::parse("document missing after root element"))?;
    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| DocpipeError::parse(format!("bad attribute on <{name}>: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DocpipeError::parse(format!("bad attribute value on <{name}>: {e}")))?;
        doc.set_attr(id, &key, value.into_owned());
    }
    Ok(id)
}
