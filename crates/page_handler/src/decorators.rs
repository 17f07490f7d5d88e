//! Small presentational decorations: buttons, icons and body template classes.

use crate::config::PageConfig;
use crate::metadata::to_class_name;
use anyhow::Error;
use html::{DOM, NodeId, Selector};

/// Turn standalone links into buttons (`decorateButtons`).
///
/// Every link gets a `title` (its text) unless it has one. A link whose
/// `href` differs from its text and that holds no image becomes:
/// - `button` when it is the only child node of a `p` or `div`,
/// - `button primary` when wrapped alone in `<p><strong>`,
/// - `button secondary` when wrapped alone in `<p><em>`.
///
/// The enclosing paragraph or `div` gets `button-container`.
pub fn decorate_buttons(dom: &mut DOM, scope: NodeId) {
    for link in dom.all_by_tag(scope, "a") {
        let text = dom.text_content(link);
        if dom.attribute(link, "title").is_none_or(str::is_empty) {
            dom.set_attribute(link, "title", &text);
        }
        if dom.attribute(link, "href").unwrap_or_default() == text {
            continue;
        }
        if dom.first_by_tag(link, "img").is_some() {
            continue;
        }
        let Some(parent) = dom.parent(link) else {
            continue;
        };
        if dom.child_node_count(parent) != 1 {
            continue;
        }
        if dom.is_tag(parent, "p") || dom.is_tag(parent, "div") {
            dom.set_attribute(link, "class", "button");
            dom.add_class(parent, "button-container");
            continue;
        }
        let variant = if dom.is_tag(parent, "strong") {
            "button primary"
        } else if dom.is_tag(parent, "em") {
            "button secondary"
        } else {
            continue;
        };
        let Some(grandparent) = dom.parent(parent) else {
            continue;
        };
        if dom.child_node_count(grandparent) == 1 && dom.is_tag(grandparent, "p") {
            dom.set_attribute(link, "class", variant);
            dom.add_class(grandparent, "button-container");
        }
    }
}

/// Append an icon image to each `span.icon` carrying an `icon-{name}` class.
///
/// Spans that already hold their icon image are skipped.
///
/// # Errors
///
/// Returns an error only if the internal selector fails to parse.
pub fn decorate_icons(dom: &mut DOM, scope: NodeId, config: &PageConfig) -> Result<(), Error> {
    let selector = Selector::parse("span.icon")?;
    for span in dom.query_selector_all(scope, &selector) {
        let Some(name) = dom
            .classes(span)
            .into_iter()
            .find_map(|class| class.strip_prefix("icon-"))
            .map(str::to_owned)
        else {
            continue;
        };
        let decorated = dom
            .element_children(span)
            .into_iter()
            .any(|child| dom.dataset(child, "iconName").is_some());
        if decorated {
            continue;
        }
        let img = dom.create_element("img");
        dom.set_dataset(img, "iconName", &name);
        dom.set_attribute(img, "src", &config.icon_path(&name));
        dom.set_attribute(img, "alt", "");
        dom.set_attribute(img, "loading", "lazy");
        dom.append_child(span, img)?;
    }
    Ok(())
}

/// Content of every `<meta>` in `<head>` with the given name, joined by `", "`.
///
/// Names containing `:` (e.g. `og:title`) match the `property` attribute
/// instead of `name`. Missing metadata yields an empty string.
pub fn get_metadata(dom: &DOM, name: &str) -> String {
    let attr = if name.contains(':') { "property" } else { "name" };
    let Some(head) = dom.head() else {
        return String::new();
    };
    dom.all_by_tag(head, "meta")
        .into_iter()
        .filter(|meta| dom.attribute(*meta, attr) == Some(name))
        .map(|meta| dom.attribute(meta, "content").unwrap_or_default().to_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Add the `template` and `theme` metadata values to `<body>` as classes.
pub fn decorate_template_and_theme(dom: &mut DOM) {
    let Some(body) = dom.body() else {
        return;
    };
    for key in ["template", "theme"] {
        let value = get_metadata(dom, key);
        if value.is_empty() {
            continue;
        }
        for class in value.split(',') {
            dom.add_class(body, &to_class_name(class.trim()));
        }
    }
}
