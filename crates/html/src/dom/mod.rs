//! Document tree storage and structural mutation.
//!
//! Nodes live in an [`indextree::Arena`]; every [`NodeId`] handed out by a
//! [`DOM`] stays valid for the lifetime of that document unless the node is
//! removed with [`DOM::remove`]. Moving a node (append/prepend of a node that
//! already has a parent) detaches it first, matching DOM move semantics.

mod attributes;
mod printing;
mod query;
pub mod selector;

use anyhow::{Error, anyhow};
use indextree::{Arena, NodeId};
use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
}

impl DOMNode {
    /// New element node. Tag names are stored lower-cased.
    #[inline]
    pub fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
            },
            attrs: SmallVec::new(),
        }
    }

    #[inline]
    pub fn text(text: &str) -> Self {
        Self {
            kind: NodeKind::Text {
                text: text.to_owned(),
            },
            attrs: SmallVec::new(),
        }
    }

    #[inline]
    pub fn comment(text: &str) -> Self {
        Self {
            kind: NodeKind::Comment {
                text: text.to_owned(),
            },
            attrs: SmallVec::new(),
        }
    }

    /// Tag name for element nodes, `None` for everything else.
    #[inline]
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            NodeKind::Document | NodeKind::Text { .. } | NodeKind::Comment { .. } => None,
        }
    }
}

/// A mutable HTML document.
#[derive(Clone)]
pub struct DOM {
    dom: Arena<DOMNode>,
    root: NodeId,
}

impl Default for DOM {
    fn default() -> Self {
        Self::new()
    }
}

impl DOM {
    /// Create an empty document containing only the root `Document` node.
    pub fn new() -> Self {
        let mut dom = Arena::new();
        Self {
            root: dom.new_node(DOMNode::default()),
            dom,
        }
    }

    #[inline]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a live node. Removed nodes yield `None`.
    pub fn node(&self, id: NodeId) -> Option<&DOMNode> {
        self.dom
            .get(id)
            .filter(|node| !node.is_removed())
            .map(indextree::Node::get)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut DOMNode> {
        self.dom
            .get_mut(id)
            .filter(|node| !node.is_removed())
            .map(indextree::Node::get_mut)
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.dom.new_node(DOMNode::element(tag))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.dom.new_node(DOMNode::text(text))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.dom.new_node(DOMNode::comment(text))
    }

    pub(crate) fn insert_node(&mut self, node: DOMNode) -> NodeId {
        self.dom.new_node(node)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(DOMNode::tag)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some()
    }

    /// True when `id` is an element with the given tag (ASCII case-insensitive).
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id)
            .is_some_and(|own| own.eq_ignore_ascii_case(tag))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.dom.get(id).and_then(indextree::Node::parent)
    }

    /// All child nodes, including text and comments, in order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.dom).collect()
    }

    /// Element children only, in order (`Element.children`).
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.dom)
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Number of child nodes of any kind (`Node.childNodes.length`).
    pub fn child_node_count(&self, id: NodeId) -> usize {
        id.children(&self.dom).count()
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if either node was removed or if `child` is an
    /// ancestor of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        parent
            .checked_append(child, &mut self.dom)
            .map_err(|err| anyhow!("Failed to append {child:?} to {parent:?}: {err}"))
    }

    /// Insert `child` as the first child of `parent`, moving it if attached elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if either node was removed or if `child` is an
    /// ancestor of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        parent
            .checked_prepend(child, &mut self.dom)
            .map_err(|err| anyhow!("Failed to prepend {child:?} to {parent:?}: {err}"))
    }

    /// Append several nodes in order (`ParentNode.append(...nodes)`).
    ///
    /// # Errors
    ///
    /// Returns the first append failure.
    pub fn append_children(&mut self, parent: NodeId, children: &[NodeId]) -> Result<(), Error> {
        for child in children {
            self.append_child(parent, *child)?;
        }
        Ok(())
    }

    /// Detach a node (and its subtree) from its parent without destroying it.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.dom);
    }

    /// Remove a node and its whole subtree from the document.
    pub fn remove(&mut self, id: NodeId) {
        if self.node(id).is_some() {
            id.remove_subtree(&mut self.dom);
        }
    }

    /// Remove every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id) {
            self.remove(child);
        }
    }

    /// True when `first` comes before `second` in tree order.
    ///
    /// An ancestor precedes its descendants. Detached nodes never precede
    /// anything.
    pub fn precedes(&self, first: NodeId, second: NodeId) -> bool {
        if first == second {
            return false;
        }
        for node in self.root.descendants(&self.dom) {
            if node == first {
                return true;
            }
            if node == second {
                return false;
            }
        }
        false
    }

    /// Deep-copy `source` from another document into this one, detached.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` is not a live node of `other`.
    pub fn import_subtree(&mut self, other: &Self, source: NodeId) -> Result<NodeId, Error> {
        let data = other
            .node(source)
            .ok_or_else(|| anyhow!("Cannot import removed node {source:?}"))?
            .clone();
        let copy = self.insert_node(data);
        for child in source.children(&other.dom) {
            let child_copy = self.import_subtree(other, child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }
}
