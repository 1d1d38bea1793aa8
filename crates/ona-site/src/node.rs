//! Content node data and definition parsing.
//!
//! A [`Node`] holds the attributes a node defines itself. Attributes that
//! inherit down the tree (`language`, `template`, `navigable`, `enabled`)
//! are stored as `Option`s here and resolved against ancestors by
//! [`ContentTree`](crate::ContentTree).

use std::cmp::Ordering;

use ona_renderer::RenderEngine;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

/// Characters left unescaped in a path segment.
///
/// Unreserved characters plus the sub-delimiters that are legal inside a
/// path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Percent-escape a single path segment and lower-case the result.
///
/// Node slugs and request lookup keys both go through this function, so a
/// request for `/Caf%C3%A9` finds the node named `café`.
#[must_use]
pub fn escape_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT)
        .to_string()
        .to_lowercase()
}

/// Parse a flag value.
///
/// `1`, `on`, `true` and anything starting with `enable` are true
/// (case-insensitive). Everything else is false.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "1" || value == "on" || value == "true" || value.starts_with("enable")
}

/// Parse a flag that may be left unset (empty string) for inheritance.
fn parse_optional_flag(value: &str) -> Option<bool> {
    if value.trim().is_empty() {
        None
    } else {
        Some(parse_flag(value))
    }
}

/// Parse an integer attribute where `-1` and unparseable values mean unset.
fn parse_sentinel(value: &str) -> Option<i64> {
    value.trim().parse().ok().filter(|&v| v != -1)
}

fn non_empty_lower(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_lowercase())
    }
}

/// A scalar value in a definition file.
///
/// Definition authors write `weight: 3`, `weight: "3"` or `enabled: yes`
/// interchangeably; every form is read back as text.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Text form of the value.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s,
        }
    }
}

fn text(value: Option<Scalar>) -> String {
    value.map(Scalar::into_text).unwrap_or_default()
}

/// A custom key/value property as written in a definition file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PropertyDefinition {
    pub key: Scalar,
    #[serde(default)]
    pub value: Option<Scalar>,
}

/// Node definition as read from a YAML file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeDefinition {
    pub title: Option<Scalar>,
    pub description: Option<Scalar>,
    pub weight: Option<Scalar>,
    pub created: Option<Scalar>,
    pub last_modified: Option<Scalar>,
    pub language: Option<Scalar>,
    pub engine: Option<Scalar>,
    pub template: Option<Scalar>,
    pub navigable: Option<Scalar>,
    pub enabled: Option<Scalar>,
    pub content: Option<Scalar>,
    pub content_file: Option<Scalar>,
    pub redirect_to: Option<Scalar>,
    pub application_endpoint: Option<Scalar>,
    pub properties: Vec<PropertyDefinition>,
}

/// A custom node property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// One content page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    /// Name given by the loader (file basename).
    pub name: String,
    pub title: String,
    pub description: String,
    /// Sort weight among siblings. `None` sorts after all weighted siblings.
    pub weight: Option<i64>,
    /// Creation time (unix seconds).
    pub created: Option<i64>,
    /// Last modification time (unix seconds).
    pub last_modified: Option<i64>,
    /// Explicit language, lower-cased. `None` inherits.
    pub language: Option<String>,
    /// Explicit template name, lower-cased. `None` inherits.
    pub template: Option<String>,
    /// Explicit navigable flag. `None` inherits.
    pub navigable: Option<bool>,
    /// Explicit enabled flag. `None` inherits.
    pub enabled: Option<bool>,
    /// Render engine name, lower-cased.
    pub engine: String,
    /// Raw body.
    pub content: String,
    /// Content file named by the definition, relative to it.
    pub content_file: Option<String>,
    /// Redirect target. Non-empty makes the node a pure redirect.
    pub redirect_to: String,
    /// Whether the node handles every path below its own.
    pub application_endpoint: bool,
    pub properties: Vec<Property>,
}

impl Node {
    /// Create an empty node with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a node from its parsed definition.
    #[must_use]
    pub fn from_definition(name: impl Into<String>, def: NodeDefinition) -> Self {
        let content_file = non_empty(text(def.content_file));
        Self {
            name: name.into(),
            title: text(def.title),
            description: text(def.description),
            weight: parse_sentinel(&text(def.weight)),
            created: parse_sentinel(&text(def.created)),
            last_modified: parse_sentinel(&text(def.last_modified)),
            language: non_empty_lower(&text(def.language)),
            template: non_empty_lower(&text(def.template)),
            navigable: parse_optional_flag(&text(def.navigable)),
            enabled: parse_optional_flag(&text(def.enabled)),
            engine: text(def.engine).trim().to_lowercase(),
            content: text(def.content),
            content_file,
            redirect_to: text(def.redirect_to).trim().to_owned(),
            application_endpoint: parse_flag(&text(def.application_endpoint)),
            properties: def
                .properties
                .into_iter()
                .map(|p| Property {
                    key: p.key.into_text(),
                    value: text(p.value),
                })
                .collect(),
        }
    }

    /// Slug used as this node's path segment.
    #[must_use]
    pub fn slug(&self) -> String {
        escape_segment(&self.name)
    }

    /// Engine selected by [`Node::engine`].
    #[must_use]
    pub fn render_engine(&self) -> RenderEngine {
        RenderEngine::from_name(&self.engine)
    }

    /// First property with the given key on this node only.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Ordering of siblings within one directory level.
///
/// Weighted nodes come first, by ascending weight. Unweighted nodes follow,
/// by ascending creation time (unset creation time first).
#[must_use]
pub fn sibling_order(a: &Node, b: &Node) -> Ordering {
    match (a.weight, b.weight) {
        (Some(wa), Some(wb)) => wa.cmp(&wb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.created.cmp(&b.created),
    }
}
