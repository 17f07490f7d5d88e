use anyhow::{Result, anyhow};
use html::{DOM, NodeId};
use page_handler::PageConfig;
use page_handler::auto_blocks::{
    AUTO_BLOCK_RULES, AutoBlockRule, build_auto_blocks, build_auto_blocks_with, build_hero_block,
};
use page_handler::pipeline::DECORATION_PIPELINE;

mod common;

#[test]
fn hero_wraps_heading_and_picture_in_new_first_section() -> Result<()> {
    common::init_logger();
    let mut page = common::page_from_body(
        r#"<main><div><h1>Title</h1><p><picture><img src="/a.png"></picture></p><p>Body</p></div></main>"#,
    )?;
    let main = common::main_of(&page);
    let dom = page.dom_mut();

    assert!(build_hero_block(dom, main)?);

    let sections = dom.element_children(main);
    assert_eq!(sections.len(), 2, "hero section is added, not merged");
    let hero_section = sections[0];
    let &[hero] = dom.element_children(hero_section).as_slice() else {
        panic!("hero section should hold exactly the hero block");
    };
    assert_eq!(dom.classes(hero), vec!["hero"]);

    // div.hero > div (row) > div (cell) > [picture, h1]
    let row = dom.element_children(hero)[0];
    let cell = dom.element_children(row)[0];
    let content: Vec<&str> = dom
        .element_children(cell)
        .into_iter()
        .filter_map(|child| dom.tag_name(child))
        .collect();
    assert_eq!(content, vec!["picture", "h1"]);

    // The original section keeps the rest of its content.
    assert_eq!(
        dom.inner_html(sections[1]),
        "<p></p><p>Body</p>"
    );
    Ok(())
}

#[test]
fn hero_is_skipped_when_picture_comes_first() -> Result<()> {
    common::init_logger();
    let mut page = common::page_from_body(
        r#"<main><div><p><picture><img src="/a.png"></picture></p><h1>Title</h1></div></main>"#,
    )?;
    let main = common::main_of(&page);
    let before = page.dom().outer_html(main);

    assert!(!build_hero_block(page.dom_mut(), main)?);
    assert_eq!(page.dom().outer_html(main), before);
    Ok(())
}

#[test]
fn hero_needs_both_elements() -> Result<()> {
    common::init_logger();
    for body in [
        "<main><div><h1>Only a title</h1></div></main>",
        "<main><div><picture><img src=\"/a.png\"></picture></div></main>",
        "<main></main>",
    ] {
        let mut page = common::page_from_body(body)?;
        let main = common::main_of(&page);
        assert!(!build_hero_block(page.dom_mut(), main)?, "no hero for {body}");
    }
    Ok(())
}

#[test]
fn only_the_first_heading_and_picture_are_considered() -> Result<()> {
    common::init_logger();
    let mut page = common::page_from_body(
        r#"<main>
             <div><picture><img src="/first.png"></picture></div>
             <div><h1>Late title</h1><picture><img src="/second.png"></picture></div>
           </main>"#,
    )?;
    let main = common::main_of(&page);
    build_auto_blocks(page.dom_mut(), main);
    assert_eq!(page.dom().element_children(main).len(), 2);
    Ok(())
}

/// Rule that tries to move `main` into its own first child, which the tree rejects.
fn nest_main_in_child(dom: &mut DOM, main: NodeId) -> Result<bool> {
    let child = dom
        .element_children(main)
        .first()
        .copied()
        .ok_or_else(|| anyhow!("main is empty"))?;
    dom.append_child(child, main)?;
    Ok(true)
}

#[test]
fn failing_rule_is_logged_and_decoration_continues() -> Result<()> {
    common::init_logger();
    assert_eq!(AUTO_BLOCK_RULES.map(|(name, _)| name), ["hero"]);

    let mut page = common::page_from_fixture("page.html", "https://example.com/page")?;
    let main = common::main_of(&page);
    let config = PageConfig::default();
    let rules = [
        ("nest-main", nest_main_in_child as AutoBlockRule),
        ("hero", build_hero_block as AutoBlockRule),
    ];

    for step in &DECORATION_PIPELINE {
        if step.name == "build-auto-blocks" {
            let built = build_auto_blocks_with(page.dom_mut(), main, &rules);
            assert_eq!(built, 1, "later rules still run after a failure");
        } else {
            step.apply(page.dom_mut(), main, &config)?;
        }
    }

    let dom = page.dom();
    assert!(dom.parent(main).is_some_and(|parent| dom.is_tag(parent, "body")));
    let sections = dom.element_children(main);
    assert_eq!(sections.len(), 4);
    assert!(dom.has_class(sections[0], "hero-container"));
    assert!(sections.iter().all(|section| dom.has_class(*section, "section")));
    Ok(())
}
