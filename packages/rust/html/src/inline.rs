//! Inline normalization: merging, unwrapping and pruning passes that tidy a
//! tree after splitting and splicing.

use tracing::{debug, instrument};

use docpipe_dom::{Document, NodeId, merge_adjacent, remove_preserving_tail, unwrap_element};
use docpipe_shared::{CleanupOptions, Result};

/// `<b>text</b><b>more</b>` becomes `<b>textmore</b>` for every tag in
/// `tags`. Elements separated by any tail text are left alone.
///
/// Returns the number of elements merged away.
pub fn merge_adjacent_inlines<S: AsRef<str>>(doc: &mut Document, tags: &[S]) -> usize {
    let mut merged = 0;
    for node in doc.find_all(doc.root(), tags) {
        if !is_attached(doc, node) {
            continue;
        }
        while let Some(next) = doc.next_sibling(node) {
            if doc.tag(next) != doc.tag(node) || !doc.tail(node).is_empty() {
                break;
            }
            merge_adjacent(doc, node, next);
            merged += 1;
        }
    }
    merged
}

/// Unwrap childless elements in `tags` whose text is empty or whitespace.
/// Whitespace text and tails stay where they were.
///
/// Returns the number of elements removed.
pub fn remove_empty_inlines<S: AsRef<str>>(doc: &mut Document, tags: &[S]) -> Result<usize> {
    let mut removed = 0;
    for node in doc.find_all(doc.root(), tags) {
        if !is_attached(doc, node) || !doc.children(node).is_empty() {
            continue;
        }
        if doc.text(node).trim().is_empty() {
            unwrap_element(doc, node)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Remove paragraphs without visible text or a `meaningful` descendant.
/// Ancestors left childless and blank by a removal go too, up to (but not
/// including) the root.
///
/// Returns the number of elements removed.
pub fn remove_empty_paragraphs<S: AsRef<str>>(
    doc: &mut Document,
    paragraph_tags: &[S],
    meaningful: &[S],
) -> Result<usize> {
    let mut removed = 0;
    for node in doc.find_all(doc.root(), paragraph_tags) {
        if !is_attached(doc, node) || !is_blank(doc, node, meaningful) {
            continue;
        }
        let mut parent = doc.parent(node);
        remove_preserving_tail(doc, node)?;
        removed += 1;

        while let Some(ancestor) = parent {
            if ancestor == doc.root()
                || !doc.children(ancestor).is_empty()
                || !doc.text(ancestor).trim().is_empty()
            {
                break;
            }
            parent = doc.parent(ancestor);
            remove_preserving_tail(doc, ancestor)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Run the three passes until none of them changes anything, so a second
/// call is always a no-op.
#[instrument(skip_all)]
pub fn normalize(doc: &mut Document, options: &CleanupOptions) -> Result<()> {
    loop {
        let merged = merge_adjacent_inlines(doc, &options.merge_tags);
        let unwrapped = remove_empty_inlines(doc, &options.unwrap_tags)?;
        let pruned =
            remove_empty_paragraphs(doc, &options.paragraph_tags, &options.meaningful_tags)?;
        debug!(merged, unwrapped, pruned, "normalization pass");
        if merged + unwrapped + pruned == 0 {
            return Ok(());
        }
    }
}

/// Reachable from the root. Elements removed by an earlier step are not.
fn is_attached(doc: &Document, node: NodeId) -> bool {
    node != doc.root() && doc.ancestors(node).last().copied() == Some(doc.root())
}

fn is_blank<S: AsRef<str>>(doc: &Document, node: NodeId, meaningful: &[S]) -> bool {
    doc.text_content(node).trim().is_empty()
        && !doc
            .descendants(node)
            .into_iter()
            .any(|d| doc.has_tag_in(d, meaningful))
}
