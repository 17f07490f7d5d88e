//! Block construction, decoration and loading.
//!
//! A block is a `div` whose first class names it. Decoration marks it with
//! `class="block"`, `data-block-name` and `data-block-status`; loading links
//! the block stylesheet and runs the registered [`BlockDecorator`].
//!
//! [`BlockDecorator`]: crate::capabilities::BlockDecorator

use crate::capabilities::Capabilities;
use crate::config::PageConfig;
use crate::decorators::decorate_buttons;
use anyhow::{Context as _, Error};
use html::{DOM, NodeId, Selector};
use log::{debug, trace, warn};

pub const STATUS_INITIALIZED: &str = "initialized";
pub const STATUS_LOADING: &str = "loading";
pub const STATUS_LOADED: &str = "loaded";

/// One entry of a block cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    /// An existing node, moved into the cell.
    Node(NodeId),
    /// Markup parsed and appended to the cell.
    Html(String),
}

pub type BlockCell = Vec<CellContent>;
pub type BlockRow = Vec<BlockCell>;

/// Build a `div.{name}` block with one `div` per row and one `div` per cell.
///
/// # Errors
///
/// Returns an error if a node cannot be moved into its cell or markup fails
/// to parse.
pub fn build_block(dom: &mut DOM, name: &str, rows: &[BlockRow]) -> Result<NodeId, Error> {
    let block = dom.create_element("div");
    dom.add_class(block, name);
    for row in rows {
        let row_element = dom.create_element("div");
        for cell in row {
            let cell_element = dom.create_element("div");
            for content in cell {
                match content {
                    CellContent::Node(node) => dom
                        .append_child(cell_element, *node)
                        .with_context(|| format!("moving content into block {name}"))?,
                    CellContent::Html(markup) if markup.is_empty() => {}
                    CellContent::Html(markup) => dom.append_html(cell_element, markup)?,
                }
            }
            dom.append_child(row_element, cell_element)?;
        }
        dom.append_child(block, row_element)?;
    }
    Ok(block)
}

/// Mark a block as initialized (`decorateBlock`).
///
/// Elements without a class and blocks that already carry a status are left
/// alone.
///
/// # Errors
///
/// Returns an error only if the internal selector fails to parse.
pub fn decorate_block(dom: &mut DOM, block: NodeId) -> Result<(), Error> {
    let Some(name) = dom.classes(block).first().map(|class| (*class).to_owned()) else {
        return Ok(());
    };
    if dom.dataset(block, "blockStatus").is_some() {
        return Ok(());
    }
    dom.add_class(block, "block");
    dom.set_dataset(block, "blockName", &name);
    dom.set_dataset(block, "blockStatus", STATUS_INITIALIZED);
    if let Some(wrapper) = dom.parent(block) {
        dom.add_class(wrapper, &format!("{name}-wrapper"));
    }
    let section_selector = Selector::parse(".section")?;
    if let Some(section) = dom.closest(block, &section_selector) {
        dom.add_class(section, &format!("{name}-container"));
    }
    decorate_buttons(dom, block);
    trace!("Decorated block {name}");
    Ok(())
}

/// Decorate every `div.section > div > div` under `main`.
///
/// # Errors
///
/// Returns an error only if the internal selector fails to parse.
pub fn decorate_blocks(dom: &mut DOM, main: NodeId) -> Result<(), Error> {
    let selector = Selector::parse("div.section > div > div")?;
    for block in dom.query_selector_all(main, &selector) {
        decorate_block(dom, block)?;
    }
    Ok(())
}

/// Load one block: link its stylesheet, then run its decorator.
///
/// Returns `false` when the block was already loading or loaded. Stylesheet
/// and decorator failures are logged and the block still ends up `loaded`.
pub async fn load_block(
    dom: &mut DOM,
    block: NodeId,
    config: &PageConfig,
    capabilities: &Capabilities,
) -> bool {
    if matches!(
        dom.dataset(block, "blockStatus"),
        Some(STATUS_LOADING | STATUS_LOADED)
    ) {
        return false;
    }
    dom.set_dataset(block, "blockStatus", STATUS_LOADING);
    let name = dom
        .dataset(block, "blockName")
        .map(str::to_owned)
        .or_else(|| dom.classes(block).first().map(|class| (*class).to_owned()))
        .unwrap_or_default();

    let href = config.block_stylesheet(&name);
    if let Err(err) = capabilities.stylesheets.load_css(dom, &href).await {
        warn!("failed to load block {name} styles: {err:#}");
    }
    match capabilities.blocks.get(&name) {
        Some(decorator) => {
            if let Err(err) = decorator.decorate(dom, block).await {
                warn!("failed to load block {name}: {err:#}");
            }
        }
        None => debug!("No decorator registered for block {name}"),
    }

    dom.set_dataset(block, "blockStatus", STATUS_LOADED);
    true
}
