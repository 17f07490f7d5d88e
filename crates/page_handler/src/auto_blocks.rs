//! Blocks synthesized from implicit page structure.

use crate::blocks::{CellContent, build_block};
use anyhow::{Context as _, Error};
use html::{DOM, NodeId};
use log::{debug, error};

/// Wrap the page's leading heading and picture in a `hero` block.
///
/// Fires only when `main` has both an `h1` and a `picture` and the first
/// `h1` comes before the first `picture`. The block holds the picture then the
/// heading, inside a new section prepended to `main`. Returns whether a hero
/// was built.
///
/// # Errors
///
/// Returns an error if the heading or picture cannot be moved.
pub fn build_hero_block(dom: &mut DOM, main: NodeId) -> Result<bool, Error> {
    let (Some(heading), Some(picture)) =
        (dom.first_by_tag(main, "h1"), dom.first_by_tag(main, "picture"))
    else {
        return Ok(false);
    };
    if !dom.precedes(heading, picture) {
        return Ok(false);
    }
    let section = dom.create_element("div");
    let hero = build_block(
        dom,
        "hero",
        &[vec![vec![CellContent::Node(picture), CellContent::Node(heading)]]],
    )?;
    dom.append_child(section, hero)?;
    dom.prepend_child(main, section)
        .context("prepending hero section")?;
    debug!("Built hero block");
    Ok(true)
}

/// One auto-blocking rule. Returns whether it added a block.
pub type AutoBlockRule = fn(&mut DOM, NodeId) -> Result<bool, Error>;

/// Rules run by [`build_auto_blocks`], in order.
pub static AUTO_BLOCK_RULES: [(&str, AutoBlockRule); 1] = [("hero", build_hero_block)];

/// Run every rule of [`AUTO_BLOCK_RULES`]. Failures are logged and never abort decoration.
pub fn build_auto_blocks(dom: &mut DOM, main: NodeId) {
    build_auto_blocks_with(dom, main, &AUTO_BLOCK_RULES);
}

/// Run `rules` in order and return how many added a block.
///
/// A failing rule is logged and the remaining rules still run.
pub fn build_auto_blocks_with(dom: &mut DOM, main: NodeId, rules: &[(&str, AutoBlockRule)]) -> usize {
    let mut built = 0;
    for (name, rule) in rules {
        match rule(dom, main) {
            Ok(true) => built += 1,
            Ok(false) => {}
            Err(err) => error!("Auto Blocking failed in {name} rule: {err:#}"),
        }
    }
    built
}
