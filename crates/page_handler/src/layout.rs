//! Two-column section layouts driven by section metadata.
//!
//! An author selects the layout with a `Layout | columns` metadata row. The
//! value cell may embed a one-row table whose cells give the column widths:
//!
//! ```html
//! <div class="section-metadata">
//!   <div>
//!     <div>Layout</div>
//!     <div>columns<table><tr><td>30%</td><td>70%</td></tr></table></div>
//!   </div>
//! </div>
//! ```
//!
//! The widths land on the section as `--left` / `--right` custom properties
//! and the section is tagged `data-layout="columns"`. After section
//! decoration, [`build_layout_container`] splits the section's two wrappers
//! into grid columns.

use crate::metadata::{read_block_config, to_camel_case};
use anyhow::{Context as _, Error};
use html::{DOM, NodeId, Selector};
use log::trace;

const LAYOUT_KEY: &str = "layout";
const COLUMNS_VALUE: &str = "columns";

/// What the layout interpreter did to one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutOutcome {
    /// No metadata, or no `layout = columns` entry. The section is untouched.
    NoLayout,
    /// Tagged `data-layout="columns"` without width variables.
    LayoutTagOnly,
    /// Tagged, with `--left` (and `--right` when the table has a second cell).
    ColumnsConfigured { left: String, right: Option<String> },
}

fn cell_mentions(dom: &DOM, cell: Option<&NodeId>, needle: &str) -> bool {
    cell.is_some_and(|cell| dom.inner_html(*cell).to_lowercase().contains(needle))
}

/// Column widths from the last qualifying metadata row.
fn read_widths(dom: &DOM, metadata: NodeId) -> Option<(String, Option<String>)> {
    let mut widths = None;
    for row in dom.element_children(metadata) {
        if !dom.is_tag(row, "div") {
            continue;
        }
        let cells = dom.element_children(row);
        if !cell_mentions(dom, cells.first(), LAYOUT_KEY)
            || !cell_mentions(dom, cells.get(1), COLUMNS_VALUE)
        {
            continue;
        }
        let Some(table) = cells.get(1).and_then(|cell| dom.first_by_tag(*cell, "table")) else {
            continue;
        };
        let values: Vec<String> = dom
            .all_by_tag(table, "td")
            .into_iter()
            .map(|td| dom.inner_html(td))
            .collect();
        let mut values = values.into_iter();
        if let Some(left) = values.next() {
            widths = Some((left, values.next()));
        }
    }
    widths
}

/// Interpret the layout metadata of a single section.
///
/// # Errors
///
/// Returns an error only if the internal selector fails to parse.
pub fn interpret_section(dom: &mut DOM, section: NodeId) -> Result<LayoutOutcome, Error> {
    let selector = Selector::parse("div.section-metadata")?;
    let Some(metadata) = dom.query_selector(section, &selector) else {
        return Ok(LayoutOutcome::NoLayout);
    };
    let config = read_block_config(dom, metadata);
    let selected = config
        .get(LAYOUT_KEY)
        .and_then(|value| value.as_single())
        .is_some_and(|value| value == COLUMNS_VALUE);
    if !selected {
        return Ok(LayoutOutcome::NoLayout);
    }

    let widths = read_widths(dom, metadata);
    if let Some((left, right)) = &widths {
        dom.set_style_property(section, "--left", left);
        if let Some(right) = right {
            dom.set_style_property(section, "--right", right);
        }
    }
    dom.set_dataset(section, &to_camel_case(LAYOUT_KEY), COLUMNS_VALUE);

    Ok(match widths {
        Some((left, right)) => LayoutOutcome::ColumnsConfigured { left, right },
        None => LayoutOutcome::LayoutTagOnly,
    })
}

/// Interpret layout metadata for every `main > div`, in document order.
///
/// # Errors
///
/// Returns an error only if the internal selector fails to parse.
pub fn read_layout_meta(dom: &mut DOM, main: NodeId) -> Result<Vec<(NodeId, LayoutOutcome)>, Error> {
    let sections: Vec<NodeId> = dom
        .element_children(main)
        .into_iter()
        .filter(|child| dom.is_tag(*child, "div"))
        .collect();
    let mut outcomes = Vec::with_capacity(sections.len());
    for section in sections {
        let outcome = interpret_section(dom, section)?;
        trace!("Layout for section {section:?}: {outcome:?}");
        outcomes.push((section, outcome));
    }
    Ok(outcomes)
}

/// Split every `main > .section[data-layout="columns"]` with exactly two
/// element children into a two-column grid.
///
/// Both children move into their own `div.grid-column`, and both columns go
/// into one `div.default-content-wrapper` appended to the section. Returns the
/// number of sections rebuilt. A rebuilt section has a single child, so a
/// second run leaves it alone.
///
/// # Errors
///
/// Returns an error if a child cannot be moved.
pub fn build_layout_container(dom: &mut DOM, main: NodeId) -> Result<usize, Error> {
    let selector = Selector::parse(".section[data-layout=\"columns\"]")?;
    let mut built = 0;
    for section in dom.children_matching(main, &selector) {
        let children = dom.element_children(section);
        let [left, right] = children.as_slice() else {
            continue;
        };
        let wrapper = dom.create_element("div");
        dom.add_class(wrapper, "default-content-wrapper");
        for content in [*left, *right] {
            let column = dom.create_element("div");
            dom.add_class(column, "grid-column");
            dom.append_child(column, content)
                .context("moving content into grid column")?;
            dom.append_child(wrapper, column)?;
        }
        dom.append_child(section, wrapper)?;
        built += 1;
    }
    Ok(built)
}
