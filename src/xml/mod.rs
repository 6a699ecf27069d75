//! Minimal lossless XML element tree
//!
//! Stand-in for the host build framework's manifest loader/serializer.
//! The tree keeps attributes in document order and preserves text and
//! comment nodes so a parse/render round trip does not disturb content
//! the merge logic never touches.

mod reader;
mod writer;

pub use reader::parse;
pub use writer::render;

use std::io;
use thiserror::Error;

/// Errors from the XML boundary
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("unexpected closing tag </{0}>")]
    UnexpectedClose(String),

    #[error("document has no root element")]
    MissingRoot,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A single `name="value"` attribute, unescaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Node variants that can appear below an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute value by exact (prefixed) name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing one of the same name
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value.into(),
            None => self.attributes.push(Attribute::new(name, value)),
        }
    }

    /// Child elements with the given tag name, in document order
    pub fn child_elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter_map(move |node| match node {
            XmlNode::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    pub fn push_element(&mut self, element: Element) {
        self.children.push(XmlNode::Element(element));
    }
}

/// A parsed document: optional XML declaration plus the root element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// True when the source carried an `<?xml ...?>` declaration
    pub has_declaration: bool,
    pub root: Element,
}

impl XmlDocument {
    pub fn new(root: Element) -> Self {
        Self {
            has_declaration: true,
            root,
        }
    }
}
