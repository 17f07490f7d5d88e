//! Tree traversal and selector queries.

use super::selector::Selector;
use super::{DOM, NodeKind};
use indextree::NodeId;

impl DOM {
    /// Descendants of `scope` in tree order, excluding `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        scope.descendants(&self.dom).skip(1)
    }

    /// `scope.querySelector(selector)`.
    pub fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .find(|node| selector.matches(self, *node))
    }

    /// `scope.querySelectorAll(selector)`, in tree order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    /// `scope.querySelectorAll(':scope > selector')`.
    pub fn children_matching(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.element_children(scope)
            .into_iter()
            .filter(|child| selector.matches(self, *child))
            .collect()
    }

    /// `element.closest(selector)`: the element itself or its nearest matching ancestor.
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        id.ancestors(&self.dom)
            .find(|node| selector.matches(self, *node))
    }

    /// First descendant element of `scope` with the given tag name.
    pub fn first_by_tag(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(scope).find(|node| self.is_tag(*node, tag))
    }

    /// All descendant elements of `scope` with the given tag name.
    pub fn all_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|node| self.is_tag(*node, tag))
            .collect()
    }

    /// `document.getElementById(id)`. Case-sensitive.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.descendants(self.root)
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root)
            .into_iter()
            .find(|node| self.is_tag(*node, "html"))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|node| self.is_tag(*node, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|node| self.is_tag(*node, "body"))
    }

    /// `node.textContent`: concatenated descendant text.
    pub fn text_content(&self, id: NodeId) -> String {
        self.text_content_skipping(id, &[])
    }

    /// Like [`DOM::text_content`], but ignoring the subtrees of elements
    /// whose tag is listed in `skip_tags`.
    pub fn text_content_skipping(&self, id: NodeId, skip_tags: &[&str]) -> String {
        let mut out = String::new();
        self.collect_text(id, skip_tags, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, skip_tags: &[&str], out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text { text } => out.push_str(text),
            NodeKind::Element { tag } if skip_tags.contains(&tag.as_str()) => {}
            NodeKind::Element { .. } | NodeKind::Document => {
                for child in id.children(&self.dom) {
                    self.collect_text(child, skip_tags, out);
                }
            }
            NodeKind::Comment { .. } => {}
        }
    }
}
