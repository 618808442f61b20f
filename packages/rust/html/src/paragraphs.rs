//! Splitting paragraphs at forced line breaks.
//!
//! `<p>a <b>b<br>c</b> d</p>` becomes `<p>a <b>b</b></p><p><b>c</b> d</p>`:
//! every inline ancestor between the break and the paragraph is rebuilt on
//! the far side of the split so the formatting of the moved content survives.

use tracing::{debug, instrument};

use docpipe_dom::{Document, NodeId, TextSlot};
use docpipe_shared::Result;

/// Split every container in `containers` at each `break_tag` inside it, at
/// any depth. The breaks themselves are removed.
///
/// Breaks are handled last to first, so a split only ever moves content that
/// comes after every break still waiting to be handled.
///
/// Returns the number of splits made.
#[instrument(skip_all, fields(break_tag = break_tag))]
pub fn split_at_breaks<S: AsRef<str>>(
    doc: &mut Document,
    break_tag: &str,
    containers: &[S],
) -> Result<usize> {
    let markers = doc.find_all(doc.root(), &[break_tag]);
    let mut splits = 0;

    for &marker in markers.iter().rev() {
        let Some((container, chain)) = container_chain(doc, marker, containers) else {
            continue;
        };
        split_at(doc, marker, container, &chain)?;
        splits += 1;
    }

    debug!(splits, "split containers at breaks");
    Ok(splits)
}

/// The nearest enclosing container and the elements strictly between it and
/// `marker`, innermost first.
fn container_chain<S: AsRef<str>>(
    doc: &Document,
    marker: NodeId,
    containers: &[S],
) -> Option<(NodeId, Vec<NodeId>)> {
    let mut chain = Vec::new();
    for ancestor in doc.ancestors(marker) {
        if doc.has_tag_in(ancestor, containers) {
            return Some((ancestor, chain));
        }
        chain.push(ancestor);
    }
    None
}

fn split_at(doc: &mut Document, marker: NodeId, container: NodeId, chain: &[NodeId]) -> Result<()> {
    // fresh copies of the chain, no attributes
    let container_tag = doc.tag(container).to_string();
    let new_container = doc.create_element(&container_tag);
    let copies: Vec<NodeId> = chain
        .iter()
        .map(|&original| {
            let tag = doc.tag(original).to_string();
            doc.create_element(&tag)
        })
        .collect();

    let innermost = copies.first().copied().unwrap_or(new_container);
    let after_marker = doc.take_slot(marker, TextSlot::Tail);
    doc.set_text(innermost, after_marker);
    for sibling in doc.following_siblings(marker) {
        doc.append(innermost, sibling);
    }

    for (level, (&original, &copy)) in chain.iter().zip(&copies).enumerate() {
        let holder = copies.get(level + 1).copied().unwrap_or(new_container);
        doc.append(holder, copy);
        let tail = doc.take_slot(original, TextSlot::Tail);
        doc.set_tail(copy, tail);
        for sibling in doc.following_siblings(original) {
            doc.append(holder, sibling);
        }
    }

    let tail = doc.take_slot(container, TextSlot::Tail);
    doc.set_tail(new_container, tail);
    doc.insert_after(container, new_container)?;
    doc.detach(marker);

    debug!(depth = chain.len(), "split container");
    Ok(())
}
