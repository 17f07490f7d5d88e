//! Page handler for content-managed pages.
//!
//! This crate turns a server-rendered document into a decorated page. The
//! decoration pipeline groups `<main>` into sections and blocks, synthesizes
//! auto-blocks and builds layout grids from section metadata. The load
//! scheduler then loads the page in eager, lazy and delayed phases. Anything
//! that would need a host (block rendering, stylesheets, images, session
//! storage) is reached through the traits in [`capabilities`].

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Private helpers are small and named for what they do"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Cross-crate inlining is not a concern for this crate"
)]

/// Hero and other blocks synthesized from page structure
pub mod auto_blocks;
pub mod blocks;
pub mod capabilities;
pub mod config;
/// Button, icon and template/theme decoration
pub mod decorators;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod scheduler;
pub mod sections;
pub mod session;
pub mod state;
pub mod telemetry;
/// URL streaming utilities for `file` URLs
mod url;

pub use capabilities::{BlockDecorator, BlockRegistry, Capabilities};
pub use config::PageConfig;
pub use pipeline::decorate_main;
pub use scheduler::{LoadPhase, LoadScheduler};
pub use state::HtmlPage;
