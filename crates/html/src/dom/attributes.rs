//! Attribute, class list, dataset and inline style access.

use super::DOM;
use indextree::NodeId;

/// Convert a dataset key (`blockStatus` or `block-status`) into its attribute name.
pub fn dataset_attribute_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 6);
    name.push_str("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}

/// Split a declaration block on the `;` separators that end declarations.
///
/// A `;` inside quotes, parentheses or a character reference such as
/// `&nbsp;` or `&#160;` belongs to the value.
fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut depth = 0_usize;
    let mut reference: Option<usize> = None;
    for (index, ch) in style.char_indices() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '&' => {
                reference = Some(index);
                continue;
            }
            ';' if reference.is_some_and(|amp| index > amp + 1) => {
                reference = None;
                continue;
            }
            ';' if depth == 0 => {
                parts.push(&style[start..index]);
                start = index + 1;
            }
            _ if ch.is_ascii_alphanumeric() || ch == '#' => continue,
            _ => {}
        }
        reference = None;
    }
    parts.push(&style[start..]);
    parts
}

/// Split an inline `style` attribute into `(property, value)` declarations.
fn parse_declarations(style: &str) -> Vec<(String, String)> {
    split_declarations(style)
        .into_iter()
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            // Custom properties are case-sensitive, everything else is not.
            let name = if name.starts_with("--") {
                name.to_owned()
            } else {
                name.to_ascii_lowercase()
            };
            Some((name, value.trim().to_owned()))
        })
        .collect()
}

fn serialize_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl DOM {
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?
            .attrs
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Set an attribute, replacing an existing value in place.
    ///
    /// Only elements carry attributes; other node kinds are left alone.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if !self.is_element(id) {
            return;
        }
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        if let Some(existing) = node.attrs.iter_mut().find(|(attr, _)| *attr == name) {
            value.clone_into(&mut existing.1);
        } else {
            node.attrs.push((name, value.to_owned()));
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attrs.retain(|(attr, _)| !attr.eq_ignore_ascii_case(name));
        }
    }

    /// Class tokens in attribute order (`Element.classList`).
    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attribute(id, "class")
            .map(|class| class.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).contains(&class)
    }

    /// Add a class token unless it is already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if class.is_empty() || self.has_class(id, class) {
            return;
        }
        let mut tokens: Vec<String> = self.classes(id).into_iter().map(str::to_owned).collect();
        tokens.push(class.to_owned());
        self.set_attribute(id, "class", &tokens.join(" "));
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let tokens: Vec<String> = self
            .classes(id)
            .into_iter()
            .filter(|token| *token != class)
            .map(str::to_owned)
            .collect();
        self.set_attribute(id, "class", &tokens.join(" "));
    }

    /// Read `element.dataset[key]`.
    pub fn dataset(&self, id: NodeId, key: &str) -> Option<&str> {
        self.attribute(id, &dataset_attribute_name(key))
    }

    /// Write `element.dataset[key] = value`.
    pub fn set_dataset(&mut self, id: NodeId, key: &str, value: &str) {
        self.set_attribute(id, &dataset_attribute_name(key), value);
    }

    /// Read one declaration from the inline `style` attribute.
    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attribute(id, "style")?;
        parse_declarations(style)
            .into_iter()
            .rev()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// `element.style.setProperty(property, value)`.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) {
        let mut declarations = self
            .attribute(id, "style")
            .map(parse_declarations)
            .unwrap_or_default();
        if let Some(existing) = declarations.iter_mut().find(|(name, _)| name == property) {
            value.clone_into(&mut existing.1);
        } else {
            declarations.push((property.to_owned(), value.to_owned()));
        }
        self.set_attribute(id, "style", &serialize_declarations(&declarations));
    }

    /// `element.style.removeProperty(property)`. Drops the attribute once empty.
    pub fn remove_style_property(&mut self, id: NodeId, property: &str) {
        let Some(style) = self.attribute(id, "style") else {
            return;
        };
        let mut declarations = parse_declarations(style);
        declarations.retain(|(name, _)| name != property);
        if declarations.is_empty() {
            self.remove_attribute(id, "style");
        } else {
            self.set_attribute(id, "style", &serialize_declarations(&declarations));
        }
    }
}
