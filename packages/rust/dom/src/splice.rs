//! Tree surgery that moves character data without losing any of it.

use std::ops::Range;

use docpipe_shared::{DocpipeError, Result};

use crate::tree::{Document, NodeId, TextSlot};

/// Wrap part of an element's own text or tail in a new element.
///
/// The target string is split into prefix / match / suffix. The prefix stays
/// where it was, the match becomes the new element's text and the suffix its
/// tail. When splicing a tail the new element becomes the next sibling of
/// `node`; when splicing own text it becomes `node`'s first child, ahead of
/// the existing children. No other element or tail is touched.
///
/// `range` defaults to the whole string. `factory` receives the matched text
/// and returns the (detached) element to insert.
///
/// Returns the inserted element, whose tail holds the unscanned remainder.
pub fn wrap_text<F>(
    doc: &mut Document,
    node: NodeId,
    slot: TextSlot,
    factory: F,
    range: Option<Range<usize>>,
) -> Result<NodeId>
where
    F: FnOnce(&mut Document, &str) -> NodeId,
{
    let source = doc.slot(node, slot);
    let Range { start, end } = range.unwrap_or(0..source.len());
    if start > end
        || end > source.len()
        || !source.is_char_boundary(start)
        || !source.is_char_boundary(end)
    {
        return Err(DocpipeError::validation(format!(
            "splice range {start}..{end} invalid for a string of {} bytes",
            source.len()
        )));
    }
    if slot == TextSlot::Tail && doc.parent(node).is_none() {
        return Err(DocpipeError::validation("cannot splice the tail of a detached element"));
    }

    let source = doc.take_slot(node, slot);
    let (prefix, rest) = source.split_at(start);
    let (matched, suffix) = rest.split_at(end - start);

    let wrapper = factory(doc, matched);
    doc.set_text(wrapper, matched);
    doc.set_tail(wrapper, suffix);
    doc.set_slot(node, slot, prefix);

    match slot {
        TextSlot::Tail => doc.insert_after(node, wrapper)?,
        TextSlot::Text => doc.insert(node, 0, wrapper),
    }
    Ok(wrapper)
}

/// Attach `text` where the content just before `node` ends: the previous
/// sibling's tail, or the parent's own text.
fn append_before(doc: &mut Document, node: NodeId, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    match (doc.previous_sibling(node), doc.parent(node)) {
        (Some(prev), _) => {
            let joined = format!("{}{text}", doc.tail(prev));
            doc.set_tail(prev, joined);
        }
        (None, Some(parent)) => {
            let joined = format!("{}{text}", doc.text(parent));
            doc.set_text(parent, joined);
        }
        (None, None) => {
            return Err(DocpipeError::validation("element has no parent"));
        }
    }
    Ok(())
}

/// Replace an element by its content: own text, children and tail all stay
/// in place inside the parent.
pub fn unwrap_element(doc: &mut Document, node: NodeId) -> Result<()> {
    let parent = doc
        .parent(node)
        .ok_or_else(|| DocpipeError::validation("cannot unwrap the root element"))?;

    let text = doc.take_slot(node, TextSlot::Text);
    append_before(doc, node, &text)?;

    let index = doc.index_in_parent(node).unwrap_or(0);
    let children = doc.children(node).to_vec();
    for (offset, &child) in children.iter().enumerate() {
        doc.insert(parent, index + 1 + offset, child);
    }

    let tail = doc.take_slot(node, TextSlot::Tail);
    doc.detach(node);
    match children.last() {
        Some(&last) => {
            let joined = format!("{}{tail}", doc.tail(last));
            doc.set_tail(last, joined);
        }
        None => {
            // the node is gone, so re-locate the insertion point by index
            if index > 0 {
                let prev = doc.children(parent)[index - 1];
                let joined = format!("{}{tail}", doc.tail(prev));
                doc.set_tail(prev, joined);
            } else {
                let joined = format!("{}{tail}", doc.text(parent));
                doc.set_text(parent, joined);
            }
        }
    }
    Ok(())
}

/// Remove an element and everything inside it, keeping only its tail.
pub fn remove_preserving_tail(doc: &mut Document, node: NodeId) -> Result<()> {
    if doc.parent(node).is_none() {
        return Err(DocpipeError::validation("cannot remove the root element"));
    }
    let tail = doc.take_slot(node, TextSlot::Tail);
    append_before(doc, node, &tail)?;
    doc.detach(node);
    Ok(())
}

/// Fold `next` into `node`: its text, children and tail move into `node`
/// and `next` is removed. Callers ensure `next` directly follows `node`.
pub fn merge_adjacent(doc: &mut Document, node: NodeId, next: NodeId) {
    let text = doc.take_slot(next, TextSlot::Text);
    doc.append_text(node, &text);

    for child in doc.children(next).to_vec() {
        doc.append(node, child);
    }

    let tail = doc.take_slot(next, TextSlot::Tail);
    let joined = format!("{}{tail}", doc.tail(node));
    doc.set_tail(node, joined);
    doc.detach(next);
}
