//! Arena-backed element tree.
//!
//! Every element lives in a single `Vec` and is addressed by [`NodeId`].
//! A parent owns its ordered `children` list; `parent` is a back-pointer
//! kept in sync by every mutating method. Text is stored the lxml way:
//! `text` is the content before the first child, `tail` is the content
//! after the element's end tag and before its next sibling.
//!
//! Detached elements stay in the arena and can be re-inserted; they are
//! simply unreachable from the root.

use docpipe_shared::{DocpipeError, Result};

/// Compact element identifier (index into the arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Which of an element's two strings is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextSlot {
    /// Content immediately inside the element, before its first child.
    Text,
    /// Content immediately after the element, before its next sibling.
    Tail,
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    tail: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            text: String::new(),
            tail: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Strip a namespace prefix (`akn:ref` → `ref`).
pub fn local_name(tag: &str) -> &str {
    tag.rsplit_once(':').map_or(tag, |(_, local)| local)
}

/// An element tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<ElementData>,
    root: NodeId,
}

impl Document {
    /// Create a document holding a single empty root element.
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![ElementData::new(root_tag)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Make a different element the root, detaching it from its parent first.
    /// Its tail is dropped: a root has no following siblings.
    pub fn set_root(&mut self, id: NodeId) {
        self.detach(id);
        self.node_mut(id).tail.clear();
        self.root = id;
    }

    /// Allocate a new, detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(ElementData::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> &ElementData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ElementData {
        &mut self.nodes[id.0]
    }

    // -----------------------------------------------------------------------
    // Name and attributes
    // -----------------------------------------------------------------------

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    pub fn set_tag(&mut self, id: NodeId, tag: &str) {
        self.node_mut(id).tag = tag.to_string();
    }

    /// True if the element's local name is one of `tags`.
    pub fn has_tag_in<S: AsRef<str>>(&self, id: NodeId, tags: &[S]) -> bool {
        let name = local_name(self.tag(id));
        tags.iter().any(|t| t.as_ref() == name)
    }

    /// Attributes in document order.
    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        &self.node(id).attrs
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attrs = &mut self.node_mut(id).attrs;
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let attrs = &mut self.node_mut(id).attrs;
        let pos = attrs.iter().position(|(k, _)| k == name)?;
        Some(attrs.remove(pos).1)
    }

    // -----------------------------------------------------------------------
    // Text and tail
    // -----------------------------------------------------------------------

    pub fn text(&self, id: NodeId) -> &str {
        &self.node(id).text
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.node_mut(id).text = text.into();
    }

    pub fn tail(&self, id: NodeId) -> &str {
        &self.node(id).tail
    }

    pub fn set_tail(&mut self, id: NodeId, tail: impl Into<String>) {
        self.node_mut(id).tail = tail.into();
    }

    pub fn slot(&self, id: NodeId, slot: TextSlot) -> &str {
        match slot {
            TextSlot::Text => self.text(id),
            TextSlot::Tail => self.tail(id),
        }
    }

    pub fn set_slot(&mut self, id: NodeId, slot: TextSlot, value: impl Into<String>) {
        match slot {
            TextSlot::Text => self.set_text(id, value),
            TextSlot::Tail => self.set_tail(id, value),
        }
    }

    /// Take a string out of its slot, leaving it empty.
    pub fn take_slot(&mut self, id: NodeId, slot: TextSlot) -> String {
        let node = self.node_mut(id);
        match slot {
            TextSlot::Text => std::mem::take(&mut node.text),
            TextSlot::Tail => std::mem::take(&mut node.tail),
        }
    }

    /// Append character data at the end of `parent`'s content: onto the last
    /// child's tail, or onto `parent`'s own text when it has no children.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        match self.last_child(parent) {
            Some(last) => self.node_mut(last).tail.push_str(text),
            None => self.node_mut(parent).text.push_str(text),
        }
    }

    /// All character data inside the element, excluding its own tail.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push_str(&node.text);
        for &child in &node.children {
            self.collect_text(child, out);
            out.push_str(&self.node(child).tail);
        }
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    /// Position of the element within its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    /// Siblings after the element, in order.
    pub fn following_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match (self.parent(id), self.index_in_parent(id)) {
            (Some(parent), Some(index)) => self.children(parent)[index + 1..].to_vec(),
            _ => Vec::new(),
        }
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Descendants in document order, excluding the element itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// The element and its descendants whose local name is one of `tags`,
    /// in document order.
    pub fn find_all<S: AsRef<str>>(&self, id: NodeId, tags: &[S]) -> Vec<NodeId> {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter(|&n| self.has_tag_in(n, tags))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Remove the element from its parent. Its tail travels with it.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert `child` at `index` among `parent`'s children, detaching it first.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert `new` as the next sibling of `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, new: NodeId) -> Result<()> {
        let parent = self.parent(anchor).ok_or_else(|| {
            DocpipeError::validation("cannot insert a sibling next to a detached element")
        })?;
        self.detach(new);
        let index = self
            .index_in_parent(anchor)
            .ok_or_else(|| DocpipeError::validation("anchor missing from its parent"))?;
        self.insert(parent, index + 1, new);
        Ok(())
    }
}
