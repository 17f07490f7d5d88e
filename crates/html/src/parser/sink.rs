//! html5ever tree sink.
//!
//! html5ever drives the sink through shared references and asks for element
//! names by borrow, so the sink builds a reference-counted scratch tree first.
//! [`TreeSink::finish`] then copies that tree into the arena-backed [`DOM`].

use crate::dom::DOM;
use anyhow::{Error, anyhow};
use core::cell::{Cell, RefCell};
use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, ExpandedName, LocalName, Namespace, QualName};
use indextree::NodeId;
use log::trace;
use std::borrow::Cow;
use std::rc::{Rc, Weak};

pub(crate) type Handle = Rc<SinkNode>;

pub(crate) enum SinkData {
    Document,
    Doctype,
    Element {
        name: QualName,
        attrs: RefCell<Vec<Attribute>>,
        template_contents: Option<Handle>,
    },
    Text {
        contents: RefCell<StrTendril>,
    },
    Comment {
        contents: StrTendril,
    },
    ProcessingInstruction,
}

pub(crate) struct SinkNode {
    data: SinkData,
    parent: Cell<Option<Weak<SinkNode>>>,
    children: RefCell<Vec<Handle>>,
}

impl SinkNode {
    fn new(data: SinkData) -> Handle {
        Rc::new(Self {
            data,
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
        })
    }

    fn parent(&self) -> Option<Handle> {
        let weak = self.parent.take();
        let parent = weak.as_ref().and_then(Weak::upgrade);
        self.parent.set(weak);
        parent
    }

    fn is_text(&self) -> bool {
        matches!(self.data, SinkData::Text { .. })
    }
}

fn attach(parent: &Handle, child: Handle, index: Option<usize>) {
    child.parent.set(Some(Rc::downgrade(parent)));
    let mut children = parent.children.borrow_mut();
    match index {
        Some(position) if position <= children.len() => children.insert(position, child),
        _ => children.push(child),
    }
}

fn detach(target: &Handle) {
    if let Some(parent) = target.parent() {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, target));
    }
    target.parent.set(None);
}

fn append_text(text_node: &Handle, text: &StrTendril) -> bool {
    if let SinkData::Text { contents } = &text_node.data {
        contents.borrow_mut().push_tendril(text);
        true
    } else {
        false
    }
}

/// Tree sink used by [`crate::parser::HTMLParser`].
pub(crate) struct DocumentSink {
    document: Handle,
    /// Returned by `elem_name` for non-element handles, which html5ever never asks about.
    fallback_name: QualName,
}

impl Default for DocumentSink {
    fn default() -> Self {
        Self {
            document: SinkNode::new(SinkData::Document),
            fallback_name: QualName::new(None, Namespace::from(""), LocalName::from("")),
        }
    }
}

impl DocumentSink {
    fn convert(&self) -> Result<DOM, Error> {
        let mut dom = DOM::new();
        let root = dom.root();
        for child in self.document.children.borrow().iter() {
            convert_node(&mut dom, child, root)?;
        }
        Ok(dom)
    }
}

fn convert_node(dom: &mut DOM, source: &Handle, parent: NodeId) -> Result<(), Error> {
    let node = match &source.data {
        SinkData::Document | SinkData::Doctype | SinkData::ProcessingInstruction => return Ok(()),
        SinkData::Text { contents } => dom.create_text(&contents.borrow()),
        SinkData::Comment { contents } => dom.create_comment(contents),
        SinkData::Element {
            name,
            attrs,
            template_contents,
        } => {
            let element = dom.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                dom.set_attribute(element, &attr.name.local, &attr.value);
            }
            // Template contents are flattened into the element itself.
            if let Some(contents) = template_contents {
                for child in contents.children.borrow().iter() {
                    convert_node(dom, child, element)?;
                }
            }
            element
        }
    };
    dom.append_child(parent, node)
        .map_err(|err| anyhow!("Failed to convert parsed node: {err}"))?;
    for child in source.children.borrow().iter() {
        convert_node(dom, child, node)?;
    }
    Ok(())
}

impl TreeSink for DocumentSink {
    type Handle = Handle;
    type Output = Result<DOM, Error>;
    type ElemName<'a> = ExpandedName<'a>;

    fn finish(self) -> Self::Output {
        self.convert()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        trace!("HTML parse error: {msg}");
    }

    fn get_document(&self) -> Self::Handle {
        Rc::clone(&self.document)
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> ExpandedName<'a> {
        match &target.data {
            SinkData::Element { name, .. } => name.expanded(),
            _ => self.fallback_name.expanded(),
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Self::Handle {
        let template_contents = flags
            .template
            .then(|| SinkNode::new(SinkData::Document));
        SinkNode::new(SinkData::Element {
            name,
            attrs: RefCell::new(attrs),
            template_contents,
        })
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        SinkNode::new(SinkData::Comment { contents: text })
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        SinkNode::new(SinkData::ProcessingInstruction)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(node) => {
                detach(&node);
                attach(parent, node, None);
            }
            NodeOrText::AppendText(text) => {
                let merged = parent
                    .children
                    .borrow()
                    .last()
                    .is_some_and(|last| append_text(last, &text));
                if !merged {
                    let node = SinkNode::new(SinkData::Text {
                        contents: RefCell::new(text),
                    });
                    attach(parent, node, None);
                }
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if element.parent().is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        attach(&self.document, SinkNode::new(SinkData::Doctype), None);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        match &target.data {
            SinkData::Element {
                template_contents: Some(contents),
                ..
            } => Rc::clone(contents),
            _ => Rc::clone(target),
        }
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        trace!("Document quirks mode: {mode:?}");
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let Some(parent) = sibling.parent() else {
            return;
        };
        let position = parent
            .children
            .borrow()
            .iter()
            .position(|child| Rc::ptr_eq(child, sibling));
        let Some(position) = position else {
            return;
        };
        match new_node {
            NodeOrText::AppendText(text) => {
                let previous = position
                    .checked_sub(1)
                    .and_then(|index| parent.children.borrow().get(index).map(Rc::clone));
                let merged = previous.is_some_and(|node| node.is_text() && append_text(&node, &text));
                if !merged {
                    let node = SinkNode::new(SinkData::Text {
                        contents: RefCell::new(text),
                    });
                    attach(&parent, node, Some(position));
                }
            }
            NodeOrText::AppendNode(node) => {
                detach(&node);
                // Detaching may shift the sibling if the node was an earlier child.
                let position = parent
                    .children
                    .borrow()
                    .iter()
                    .position(|child| Rc::ptr_eq(child, sibling))
                    .unwrap_or(position);
                attach(&parent, node, Some(position));
            }
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        if let SinkData::Element { attrs: existing, .. } = &target.data {
            let mut existing = existing.borrow_mut();
            for attr in attrs {
                if !existing.iter().any(|current| current.name == attr.name) {
                    existing.push(attr);
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        detach(target);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let children: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
        for child in children {
            attach(new_parent, child, None);
        }
    }
}

