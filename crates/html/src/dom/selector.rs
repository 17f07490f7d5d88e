//! A small CSS selector matcher.
//!
//! Supports compound selectors (`tag`, `*`, `.class`, `#id`, `[attr]`,
//! `[attr="v"]`, `[attr~="v"]`, `[attr^="v"]`, `[attr*="v"]`, `:not(..)`)
//! joined by the descendant (` `) and child (`>`) combinators. That is all the
//! decoration pipeline needs; anything else is rejected at parse time.

use super::DOM;
use anyhow::{Error, anyhow, bail};
use core::iter::Peekable;
use core::str::{Chars, FromStr};
use indextree::NodeId;

type Cursor<'input> = Peekable<Chars<'input>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
    Prefix(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    op: AttrOp,
}

impl AttrMatch {
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(expected) => value == expected,
            AttrOp::Includes(expected) => value.split_ascii_whitespace().any(|token| token == expected),
            AttrOp::Prefix(expected) => !expected.is_empty() && value.starts_with(expected.as_str()),
            AttrOp::Contains(expected) => !expected.is_empty() && value.contains(expected.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
    negations: Vec<Compound>,
    universal: bool,
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty()
    }

    fn matches(&self, dom: &DOM, node: NodeId) -> bool {
        let Some(tag) = dom.tag_name(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|expected| !expected.eq_ignore_ascii_case(tag)) {
            return false;
        }
        if let Some(id) = &self.id {
            if dom.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| dom.has_class(node, class))
            && self.attrs.iter().all(|attr| attr.matches(dom.attribute(node, &attr.name)))
            && !self.negations.iter().any(|negated| negated.matches(dom, node))
    }
}

/// A parsed selector. Parse once with [`Selector::parse`] and reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Compounds left to right; each combinator links a compound to the previous one.
    parts: Vec<(Combinator, Compound)>,
}

impl Selector {
    /// Parse a selector such as `div.section > div > div` or `meta[name="theme"]`.
    ///
    /// # Errors
    ///
    /// Returns an error for empty input or unsupported syntax.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let mut cursor = input.trim().chars().peekable();
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            skip_whitespace(&mut cursor);
            if cursor.peek() == Some(&'>') {
                if parts.is_empty() {
                    bail!("Selector `{input}` starts with a combinator");
                }
                cursor.next();
                combinator = Combinator::Child;
                skip_whitespace(&mut cursor);
            }
            if cursor.peek().is_none() {
                if combinator == Combinator::Child {
                    bail!("Selector `{input}` ends with a combinator");
                }
                break;
            }
            let compound = parse_compound(&mut cursor, input)?;
            if compound.is_empty() {
                bail!("Unsupported selector syntax in `{input}`");
            }
            parts.push((combinator, compound));
            combinator = Combinator::Descendant;
        }
        if parts.is_empty() {
            bail!("Empty selector");
        }
        Ok(Self { parts })
    }

    /// True when `node` matches this selector, looking at its ancestors as needed.
    pub fn matches(&self, dom: &DOM, node: NodeId) -> bool {
        self.parts
            .len()
            .checked_sub(1)
            .is_some_and(|last| self.matches_at(dom, node, last))
    }

    fn matches_at(&self, dom: &DOM, node: NodeId, index: usize) -> bool {
        let Some((combinator, compound)) = self.parts.get(index) else {
            return false;
        };
        if !compound.matches(dom, node) {
            return false;
        }
        let Some(previous) = index.checked_sub(1) else {
            return true;
        };
        match combinator {
            Combinator::Child => dom
                .parent(node)
                .is_some_and(|parent| self.matches_at(dom, parent, previous)),
            Combinator::Descendant => {
                let mut ancestor = dom.parent(node);
                while let Some(current) = ancestor {
                    if self.matches_at(dom, current, previous) {
                        return true;
                    }
                    ancestor = dom.parent(current);
                }
                false
            }
        }
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

fn skip_whitespace(cursor: &mut Cursor<'_>) {
    while cursor.peek().is_some_and(|ch| ch.is_whitespace()) {
        cursor.next();
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn parse_ident(cursor: &mut Cursor<'_>, input: &str) -> Result<String, Error> {
    let mut ident = String::new();
    while let Some(ch) = cursor.peek().copied() {
        if !is_ident_char(ch) {
            break;
        }
        ident.push(ch);
        cursor.next();
    }
    if ident.is_empty() {
        bail!("Expected identifier in selector `{input}`");
    }
    Ok(ident)
}

fn parse_attr_value(cursor: &mut Cursor<'_>, input: &str) -> Result<String, Error> {
    match cursor.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            cursor.next();
            let mut value = String::new();
            loop {
                match cursor.next() {
                    Some(ch) if ch == quote => return Ok(value),
                    Some(ch) => value.push(ch),
                    None => bail!("Unterminated string in selector `{input}`"),
                }
            }
        }
        _ => parse_ident(cursor, input),
    }
}

fn parse_attr(cursor: &mut Cursor<'_>, input: &str) -> Result<AttrMatch, Error> {
    skip_whitespace(cursor);
    let name = parse_ident(cursor, input)?.to_ascii_lowercase();
    skip_whitespace(cursor);
    let op = match cursor.next() {
        Some(']') => return Ok(AttrMatch { name, op: AttrOp::Exists }),
        Some('=') => AttrOp::Equals(String::new()),
        Some(modifier @ ('~' | '^' | '*')) => {
            if cursor.next() != Some('=') {
                bail!("Expected `=` after `{modifier}` in selector `{input}`");
            }
            match modifier {
                '~' => AttrOp::Includes(String::new()),
                '^' => AttrOp::Prefix(String::new()),
                _ => AttrOp::Contains(String::new()),
            }
        }
        other => bail!("Unexpected {other:?} in attribute selector `{input}`"),
    };
    skip_whitespace(cursor);
    let value = parse_attr_value(cursor, input)?;
    skip_whitespace(cursor);
    if cursor.next() != Some(']') {
        bail!("Expected `]` in selector `{input}`");
    }
    let op = match op {
        AttrOp::Exists | AttrOp::Equals(_) => AttrOp::Equals(value),
        AttrOp::Includes(_) => AttrOp::Includes(value),
        AttrOp::Prefix(_) => AttrOp::Prefix(value),
        AttrOp::Contains(_) => AttrOp::Contains(value),
    };
    Ok(AttrMatch { name, op })
}

fn parse_compound(cursor: &mut Cursor<'_>, input: &str) -> Result<Compound, Error> {
    let mut compound = Compound::default();
    while let Some(ch) = cursor.peek().copied() {
        match ch {
            '*' if compound.is_empty() => {
                cursor.next();
                compound.universal = true;
            }
            '.' => {
                cursor.next();
                compound.classes.push(parse_ident(cursor, input)?);
            }
            '#' => {
                cursor.next();
                compound.id = Some(parse_ident(cursor, input)?);
            }
            '[' => {
                cursor.next();
                compound.attrs.push(parse_attr(cursor, input)?);
            }
            ':' => {
                cursor.next();
                let pseudo = parse_ident(cursor, input)?;
                if pseudo != "not" || cursor.next() != Some('(') {
                    bail!("Unsupported pseudo-class `:{pseudo}` in selector `{input}`");
                }
                skip_whitespace(cursor);
                let negated = parse_compound(cursor, input)?;
                skip_whitespace(cursor);
                if negated.is_empty() || cursor.next() != Some(')') {
                    bail!("Malformed :not() in selector `{input}`");
                }
                compound.negations.push(negated);
            }
            ch if is_ident_char(ch) && compound.is_empty() => {
                compound.tag = Some(parse_ident(cursor, input)?.to_ascii_lowercase());
            }
            ch if ch.is_whitespace() || ch == '>' || ch == ')' => break,
            other => return Err(anyhow!("Unexpected `{other}` in selector `{input}`")),
        }
    }
    Ok(compound)
}
