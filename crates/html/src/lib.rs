//! Arena-backed HTML document tree for the page decoration pipeline.
//!
//! The [`dom::DOM`] type is the single document every decoration step and
//! load phase mutates in place. [`parser::HTMLParser`] builds it from a string
//! or from a byte stream delivered by the server.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

pub mod dom;
pub mod parser;

pub use dom::selector::Selector;
pub use dom::{DOM, DOMNode, NodeKind};
pub use indextree::NodeId;
