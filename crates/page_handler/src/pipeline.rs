//! The decoration pipeline applied to `<main>`.
//!
//! Steps run in a fixed order; each sees the tree exactly as the previous one
//! left it. Later steps rely on earlier ones: blocks are only found inside
//! decorated sections, and the grid builder needs the `data-layout` tag set
//! before sections are grouped.

use crate::auto_blocks::build_auto_blocks;
use crate::blocks::decorate_blocks;
use crate::config::PageConfig;
use crate::decorators::{decorate_buttons, decorate_icons};
use crate::layout::{build_layout_container, read_layout_meta};
use crate::sections::decorate_sections;
use anyhow::{Context as _, Error};
use html::{DOM, NodeId};
use log::trace;

type StepFn = fn(&mut DOM, NodeId, &PageConfig) -> Result<(), Error>;

/// A named decoration step.
#[derive(Clone, Copy)]
pub struct DecorationStep {
    pub name: &'static str,
    pub run: StepFn,
}

impl DecorationStep {
    /// Run this step alone against `main`.
    ///
    /// # Errors
    ///
    /// Returns the step's error, tagged with the step name.
    pub fn apply(&self, dom: &mut DOM, main: NodeId, config: &PageConfig) -> Result<(), Error> {
        (self.run)(dom, main, config).with_context(|| format!("decoration step {}", self.name))
    }
}

impl core::fmt::Debug for DecorationStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DecorationStep")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn buttons_step(dom: &mut DOM, main: NodeId, _config: &PageConfig) -> Result<(), Error> {
    decorate_buttons(dom, main);
    Ok(())
}

fn auto_blocks_step(dom: &mut DOM, main: NodeId, _config: &PageConfig) -> Result<(), Error> {
    build_auto_blocks(dom, main);
    Ok(())
}

fn layout_meta_step(dom: &mut DOM, main: NodeId, _config: &PageConfig) -> Result<(), Error> {
    read_layout_meta(dom, main).map(drop)
}

fn sections_step(dom: &mut DOM, main: NodeId, _config: &PageConfig) -> Result<(), Error> {
    decorate_sections(dom, main)
}

fn blocks_step(dom: &mut DOM, main: NodeId, _config: &PageConfig) -> Result<(), Error> {
    decorate_blocks(dom, main)
}

fn layout_container_step(dom: &mut DOM, main: NodeId, _config: &PageConfig) -> Result<(), Error> {
    build_layout_container(dom, main).map(drop)
}

pub static DECORATION_PIPELINE: [DecorationStep; 7] = [
    DecorationStep {
        name: "decorate-buttons",
        run: buttons_step,
    },
    DecorationStep {
        name: "decorate-icons",
        run: decorate_icons,
    },
    DecorationStep {
        name: "build-auto-blocks",
        run: auto_blocks_step,
    },
    DecorationStep {
        name: "read-layout-meta",
        run: layout_meta_step,
    },
    DecorationStep {
        name: "decorate-sections",
        run: sections_step,
    },
    DecorationStep {
        name: "decorate-blocks",
        run: blocks_step,
    },
    DecorationStep {
        name: "build-layout-container",
        run: layout_container_step,
    },
];

/// Find a step by name.
pub fn step(name: &str) -> Option<&'static DecorationStep> {
    DECORATION_PIPELINE.iter().find(|step| step.name == name)
}

/// Apply every step of [`DECORATION_PIPELINE`] to `main`, in order.
///
/// # Errors
///
/// Stops at the first failing step and returns its error.
pub fn decorate_main(dom: &mut DOM, main: NodeId, config: &PageConfig) -> Result<(), Error> {
    for step in &DECORATION_PIPELINE {
        trace!("Running decoration step {}", step.name);
        step.apply(dom, main, config)?;
    }
    Ok(())
}
