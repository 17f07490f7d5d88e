//! Section grouping and the section/header/footer loaders.

use crate::blocks::{
    STATUS_INITIALIZED, STATUS_LOADED, STATUS_LOADING, build_block, decorate_block, load_block,
};
use crate::capabilities::{Capabilities, ExecFuture, ImageLoader};
use crate::config::PageConfig;
use crate::metadata::{read_block_config, to_camel_case, to_class_name};
use anyhow::{Context as _, Error};
use html::{DOM, NodeId, Selector};
use log::{debug, trace};
use std::sync::Arc;

/// Runs after a section's blocks are loaded and before it is marked `loaded`.
pub trait SectionCallback {
    fn section_ready<'a>(&'a self, dom: &'a mut DOM, section: NodeId) -> ExecFuture<'a>;
}

/// [`SectionCallback`] that waits for the section's first image.
pub struct WaitForFirstImage {
    images: Arc<dyn ImageLoader>,
}

impl WaitForFirstImage {
    #[inline]
    #[must_use]
    pub fn new(images: Arc<dyn ImageLoader>) -> Self {
        Self { images }
    }
}

impl SectionCallback for WaitForFirstImage {
    fn section_ready<'a>(&'a self, dom: &'a mut DOM, section: NodeId) -> ExecFuture<'a> {
        Box::pin(wait_for_first_image(dom, section, &*self.images))
    }
}

fn is_block_element(dom: &DOM, id: NodeId) -> bool {
    dom.is_tag(id, "div")
        && dom
            .attribute(id, "class")
            .is_some_and(|class| !class.trim().is_empty())
}

/// Group the content of every undecorated `main > div` into sections
/// (`decorateSections`).
///
/// Each block gets its own wrapper `div`; runs of other content share a
/// `div.default-content-wrapper`. The section is marked `initialized` and
/// hidden until loaded. A nested `div.section-metadata` is applied (`style`
/// values become classes, other keys `data-*` attributes) and its wrapper
/// removed.
///
/// # Errors
///
/// Returns an error if content cannot be moved into its wrapper.
pub fn decorate_sections(dom: &mut DOM, main: NodeId) -> Result<(), Error> {
    let metadata_selector = Selector::parse("div.section-metadata")?;
    let sections: Vec<NodeId> = dom
        .element_children(main)
        .into_iter()
        .filter(|child| dom.is_tag(*child, "div") && dom.dataset(*child, "sectionStatus").is_none())
        .collect();

    for section in sections {
        let mut wrappers: Vec<NodeId> = Vec::new();
        let mut in_default_content = false;
        for child in dom.element_children(section) {
            let is_block = is_block_element(dom, child);
            if is_block || !in_default_content {
                let wrapper = dom.create_element("div");
                in_default_content = !is_block;
                if in_default_content {
                    dom.add_class(wrapper, "default-content-wrapper");
                }
                wrappers.push(wrapper);
            }
            if let Some(wrapper) = wrappers.last() {
                dom.append_child(*wrapper, child)
                    .context("grouping section content")?;
            }
        }
        dom.append_children(section, &wrappers)?;
        dom.add_class(section, "section");
        dom.set_dataset(section, "sectionStatus", STATUS_INITIALIZED);
        dom.set_style_property(section, "display", "none");

        let Some(metadata) = dom.query_selector(section, &metadata_selector) else {
            continue;
        };
        let config = read_block_config(dom, metadata);
        for (key, value) in config.iter() {
            if key == "style" {
                for style in value.to_string().split(',') {
                    dom.add_class(section, &to_class_name(style.trim()));
                }
            } else {
                dom.set_dataset(section, &to_camel_case(key), &value.to_string());
            }
        }
        match dom.parent(metadata) {
            Some(wrapper) if wrapper != section => dom.remove(wrapper),
            _ => dom.remove(metadata),
        }
    }
    Ok(())
}

/// Mark the first image of `section` eager and wait until it is ready.
///
/// Image load failures end the wait like a successful load.
///
/// # Errors
///
/// Never fails today; the `Result` matches the other section callbacks.
pub async fn wait_for_first_image(
    dom: &mut DOM,
    section: NodeId,
    images: &dyn ImageLoader,
) -> Result<(), Error> {
    let Some(img) = dom.first_by_tag(section, "img") else {
        return Ok(());
    };
    dom.set_attribute(img, "loading", "eager");
    let src = dom.attribute(img, "src").unwrap_or_default().to_owned();
    if let Err(err) = images.load_image(&src).await {
        debug!("First image {src} failed to load: {err:#}");
    }
    Ok(())
}

/// Load a section's blocks in order, then run `callback` and reveal the section.
///
/// Only sections without a status or still `initialized` are loaded; the
/// return value says whether this call loaded it.
///
/// # Errors
///
/// Propagates the callback's error. The section then stays `loading`.
pub async fn load_section(
    dom: &mut DOM,
    section: NodeId,
    callback: Option<&dyn SectionCallback>,
    config: &PageConfig,
    capabilities: &Capabilities,
) -> Result<bool, Error> {
    if !matches!(
        dom.dataset(section, "sectionStatus"),
        None | Some(STATUS_INITIALIZED)
    ) {
        return Ok(false);
    }
    dom.set_dataset(section, "sectionStatus", STATUS_LOADING);

    let block_selector = Selector::parse("div.block")?;
    for block in dom.query_selector_all(section, &block_selector) {
        load_block(dom, block, config, capabilities).await;
    }
    if let Some(callback) = callback {
        callback.section_ready(dom, section).await?;
    }

    dom.set_dataset(section, "sectionStatus", STATUS_LOADED);
    dom.remove_style_property(section, "display");
    trace!("Loaded section {section:?}");
    Ok(true)
}

/// Load every `div.section` below `container`, one after another, in
/// document order. Returns how many sections this call loaded.
///
/// # Errors
///
/// Propagates the first section failure.
pub async fn load_sections(
    dom: &mut DOM,
    container: NodeId,
    config: &PageConfig,
    capabilities: &Capabilities,
) -> Result<usize, Error> {
    let selector = Selector::parse("div.section")?;
    let mut loaded = 0;
    for section in dom.query_selector_all(container, &selector) {
        if load_section(dom, section, None, config, capabilities).await? {
            loaded += 1;
        }
    }
    Ok(loaded)
}

async fn load_fragment_block(
    dom: &mut DOM,
    host: NodeId,
    name: &str,
    config: &PageConfig,
    capabilities: &Capabilities,
) -> Result<NodeId, Error> {
    let block = build_block(dom, name, &[vec![Vec::new()]])?;
    dom.append_child(host, block)
        .with_context(|| format!("attaching {name} block"))?;
    decorate_block(dom, block)?;
    load_block(dom, block, config, capabilities).await;
    Ok(block)
}

/// Build, decorate and load a `header` block inside `header`.
///
/// # Errors
///
/// Returns an error if the block cannot be attached.
pub async fn load_header(
    dom: &mut DOM,
    header: NodeId,
    config: &PageConfig,
    capabilities: &Capabilities,
) -> Result<NodeId, Error> {
    load_fragment_block(dom, header, "header", config, capabilities).await
}

/// Build, decorate and load a `footer` block inside `footer`.
///
/// # Errors
///
/// Returns an error if the block cannot be attached.
pub async fn load_footer(
    dom: &mut DOM,
    footer: NodeId,
    config: &PageConfig,
    capabilities: &Capabilities,
) -> Result<NodeId, Error> {
    load_fragment_block(dom, footer, "footer", config, capabilities).await
}
