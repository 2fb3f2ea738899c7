//! Arena-backed element tree for the sanitised HTML export.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. Detaching
//! a node unlinks it from its parent but keeps the slot, so ids handed out
//! before a mutation (for instance by [`MarkupTree::id_index`]) stay valid
//! handles afterwards. [`MarkupTree::is_attached`] tells whether such a
//! handle is still reachable from the root.
//!
//! Text follows the element-tree convention: `text` is the content before a
//! node's first child, `tail` the content after its end tag and before the
//! next sibling.

use crate::error::GDocDownError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// Handle to a node in a [`MarkupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
struct NodeData {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    tail: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(name: impl Into<String>, attributes: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            attributes,
            text: None,
            tail: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A finite, acyclic element tree with a single root.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl MarkupTree {
    /// Create a tree holding only a root element.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![NodeData::new(root_name, Vec::new())],
            root: NodeId(0),
        }
    }

    /// Parse well-formed markup into a tree.
    ///
    /// Mismatched or unclosed tags, undefined entities, a second root element
    /// and non-whitespace text outside the root are all errors; the reported
    /// position is a byte offset into `markup`.
    pub fn parse(markup: &str) -> Result<Self, GDocDownError> {
        TreeBuilder::default().build(markup)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of node slots, detached nodes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].text.as_deref()
    }

    /// Replace the node's leading text.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.0].text = Some(text.into());
    }

    pub fn tail(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].tail.as_deref()
    }

    pub fn set_tail(&mut self, id: NodeId, tail: impl Into<String>) {
        self.nodes[id.0].tail = Some(tail.into());
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Walk `hops` parent links up from `id`.
    pub fn ancestor(&self, id: NodeId, hops: usize) -> Option<NodeId> {
        (0..hops).try_fold(id, |node, _| self.parent(node))
    }

    /// Append a new element as the last child of `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        attributes: Vec<(String, String)>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut data = NodeData::new(name, attributes);
        data.parent = Some(parent);
        self.nodes.push(data);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Unlink `id` (and its subtree) from its parent.
    ///
    /// The node's tail belongs to the parent's content, so it stays behind:
    /// it is appended to the previous sibling's tail, or to the parent's text
    /// when `id` was the first child. Returns false for the root or a node
    /// that is already detached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes[id.0].parent.take() else {
            return false;
        };
        let siblings = &self.nodes[parent.0].children;
        let position = siblings.iter().position(|&child| child == id);
        let previous = position.and_then(|i| i.checked_sub(1)).map(|i| siblings[i]);
        self.nodes[parent.0].children.retain(|&child| child != id);

        if let Some(tail) = self.nodes[id.0].tail.take() {
            let slot = match previous {
                Some(previous) => &mut self.nodes[previous.0].tail,
                None => &mut self.nodes[parent.0].text,
            };
            slot.get_or_insert_with(String::new).push_str(&tail);
        }
        true
    }

    /// True when `id` is the root or reachable from it.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut node = id;
        loop {
            if node == self.root {
                return true;
            }
            match self.parent(node) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// First direct child of `id` with the given element name.
    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.name(child) == name)
    }

    /// Attached descendants of `id` in document order, `id` itself first.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Map every `id` attribute of an attached node to that node.
    ///
    /// When an id repeats, the first node in document order wins.
    pub fn id_index(&self) -> HashMap<String, NodeId> {
        let mut index = HashMap::new();
        for node in self.descendants(self.root) {
            if let Some(value) = self.attribute(node, "id") {
                index.entry(value.to_string()).or_insert(node);
            }
        }
        index
    }

    /// The node's text followed by, for each child, the child's collected
    /// text and then the child's tail. The node's own tail is not included.
    pub fn collect_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text_into(id, &mut out);
        out
    }

    fn collect_text_into(&self, id: NodeId, out: &mut String) {
        if let Some(text) = self.text(id) {
            out.push_str(text);
        }
        for &child in self.children(id) {
            self.collect_text_into(child, out);
            if let Some(tail) = self.tail(child) {
                out.push_str(tail);
            }
        }
    }
}

/// Pre-order iterator returned by [`MarkupTree::descendants`].
pub struct Descendants<'a> {
    tree: &'a MarkupTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(node).iter().rev().copied());
        Some(node)
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<NodeData>,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn build(mut self, markup: &str) -> Result<MarkupTree, GDocDownError> {
        let mut reader = Reader::from_str(markup);
        reader.check_end_names(true);

        loop {
            let position = reader.buffer_position();
            let event = reader.read_event().map_err(|e| GDocDownError::MarkupParseError {
                position: reader.buffer_position(),
                detail: e.to_string(),
            })?;
            match event {
                Event::Start(start) => {
                    let id = self.open_element(&start, position)?;
                    self.open.push(id);
                }
                Event::Empty(start) => {
                    self.open_element(&start, position)?;
                }
                Event::End(_) => {
                    if self.open.pop().is_none() {
                        return Err(parse_error(position, "end tag without a matching start tag"));
                    }
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| parse_error(position, e.to_string()))?;
                    self.push_text(&text, position)?;
                }
                Event::CData(data) => {
                    let raw = data.into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|e| parse_error(position, e.to_string()))?;
                    self.push_text(text, position)?;
                }
                Event::Eof => break,
                // Declarations, doctype, comments and processing instructions
                // carry no document text.
                _ => {}
            }
        }

        if let Some(&unclosed) = self.open.last() {
            return Err(parse_error(
                markup.len(),
                format!("unclosed <{}> at end of input", self.nodes[unclosed.0].name),
            ));
        }
        if self.nodes.is_empty() {
            return Err(parse_error(0, "no root element"));
        }
        Ok(MarkupTree {
            nodes: self.nodes,
            root: NodeId(0),
        })
    }

    fn open_element(&mut self, start: &BytesStart<'_>, position: usize) -> Result<NodeId, GDocDownError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| parse_error(position, e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| parse_error(position, e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        let parent = self.open.last().copied();
        if parent.is_none() && !self.nodes.is_empty() {
            return Err(parse_error(position, format!("second root element <{name}>")));
        }

        let id = NodeId(self.nodes.len());
        let mut data = NodeData::new(name, attributes);
        data.parent = parent;
        self.nodes.push(data);
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        Ok(id)
    }

    fn push_text(&mut self, text: &str, position: usize) -> Result<(), GDocDownError> {
        let Some(&current) = self.open.last() else {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(parse_error(position, "text outside the root element"));
        };
        let last_child = self.nodes[current.0].children.last().copied();
        let slot = match last_child {
            Some(last) => &mut self.nodes[last.0].tail,
            None => &mut self.nodes[current.0].text,
        };
        slot.get_or_insert_with(String::new).push_str(text);
        Ok(())
    }
}

fn parse_error(position: usize, detail: impl Into<String>) -> GDocDownError {
    GDocDownError::MarkupParseError {
        position,
        detail: detail.into(),
    }
}
