//! Key/value configuration tables authored inside the document.
//!
//! A configuration table is a `div` whose `div` rows hold a key cell followed
//! by one or more value cells:
//!
//! ```html
//! <div class="section-metadata">
//!   <div><div>Style</div><div>highlight, dark</div></div>
//!   <div><div>Layout</div><div>columns</div></div>
//! </div>
//! ```

use core::fmt;
use html::{DOM, NodeId};
use serde::{Serialize, Serializer};

/// Value of one configuration row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Single(String),
    List(Vec<String>),
}

impl ConfigValue {
    fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::Single(values.remove(0))
        } else {
            Self::List(values)
        }
    }

    /// The value when the row resolved to exactly one string.
    #[inline]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value.as_str()),
            Self::List(_) => None,
        }
    }

    /// All values in order. A single value yields one entry.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Lists render comma-joined, the way they land in `data-*` attributes.
impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => f.write_str(value),
            Self::List(values) => f.write_str(&values.join(",")),
        }
    }
}

/// Parsed configuration table. Keys keep first-seen order; a repeated key
/// overwrites the earlier value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockConfig {
    entries: Vec<(String, ConfigValue)>,
}

impl BlockConfig {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: String, value: ConfigValue) {
        if let Some(existing) = self.entries.iter_mut().find(|(name, _)| *name == key) {
            existing.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for BlockConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Normalize free text into a CSS class name.
///
/// Lower-cases, turns every run of characters outside `[0-9a-z]` into a single
/// `-`, and strips leading and trailing dashes.
pub fn to_class_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_digit() || ch.is_ascii_lowercase() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// [`to_class_name`], then `-x` becomes `X` for every lower-case letter `x`.
pub fn to_camel_case(name: &str) -> String {
    let class_name = to_class_name(name);
    let mut out = String::with_capacity(class_name.len());
    let mut chars = class_name.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '-'
            && let Some(next) = chars.peek().copied().filter(char::is_ascii_lowercase)
        {
            chars.next();
            out.push(next.to_ascii_uppercase());
            continue;
        }
        out.push(ch);
    }
    out
}

/// True when `node` sits inside a `table` nested in `cell`.
fn inside_table(dom: &DOM, cell: NodeId, node: NodeId) -> bool {
    let mut current = dom.parent(node);
    while let Some(parent) = current {
        if parent == cell {
            return false;
        }
        if dom.is_tag(parent, "table") {
            return true;
        }
        current = dom.parent(parent);
    }
    false
}

/// Elements with `tag` inside `cell`, ignoring nested tables.
fn cell_elements(dom: &DOM, cell: NodeId, tag: &str) -> Vec<NodeId> {
    dom.all_by_tag(cell, tag)
        .into_iter()
        .filter(|node| !inside_table(dom, cell, *node))
        .collect()
}

fn cell_text(dom: &DOM, id: NodeId) -> String {
    dom.text_content_skipping(id, &["table"]).trim().to_owned()
}

/// Resolve a value cell: link targets, then image sources, then paragraph
/// texts, then the plain cell text.
fn resolve_cell(dom: &DOM, cell: NodeId) -> ConfigValue {
    let links: Vec<NodeId> = cell_elements(dom, cell, "a")
        .into_iter()
        .filter(|link| dom.has_attribute(*link, "href"))
        .collect();
    if !links.is_empty() {
        return ConfigValue::from_values(
            links
                .iter()
                .filter_map(|link| dom.attribute(*link, "href"))
                .map(|href| href.trim().to_owned())
                .collect(),
        );
    }
    let images = cell_elements(dom, cell, "img");
    if !images.is_empty() {
        return ConfigValue::from_values(
            images
                .iter()
                .map(|img| dom.attribute(*img, "src").unwrap_or_default().trim().to_owned())
                .collect(),
        );
    }
    let paragraphs = cell_elements(dom, cell, "p");
    if !paragraphs.is_empty() {
        return ConfigValue::from_values(
            paragraphs
                .iter()
                .map(|paragraph| cell_text(dom, *paragraph))
                .collect(),
        );
    }
    ConfigValue::Single(cell_text(dom, cell))
}

/// Read a configuration table (`readBlockConfig`).
///
/// Keys are normalized with [`to_class_name`]. Rows without a value cell are
/// skipped. A row with several value cells yields a [`ConfigValue::List`] of
/// all of them in order.
pub fn read_block_config(dom: &DOM, block: NodeId) -> BlockConfig {
    let mut config = BlockConfig::default();
    for row in dom.element_children(block) {
        if !dom.is_tag(row, "div") {
            continue;
        }
        let cells = dom.element_children(row);
        let Some((key_cell, value_cells)) = cells.split_first() else {
            continue;
        };
        let value = match value_cells {
            [] => continue,
            [single] => resolve_cell(dom, *single),
            many => ConfigValue::List(
                many.iter()
                    .flat_map(|cell| {
                        resolve_cell(dom, *cell)
                            .values()
                            .into_iter()
                            .map(str::to_owned)
                            .collect::<Vec<_>>()
                    })
                    .collect(),
            ),
        };
        config.insert(to_class_name(&dom.text_content(*key_cell)), value);
    }
    config
}
