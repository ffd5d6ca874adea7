//! Owned XML fragments.

use crate::name::{Attribute, QName};

/// A node of an owned fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Element with attributes and children.
    Element(Element),
    /// Character data (unescaped).
    Text(String),
    /// Comment body.
    Comment(String),
    /// CDATA section body.
    CData(String),
    /// Processing instruction body (`target data`).
    ProcessingInstruction(String),
}

impl Content {
    /// The element, if this node is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutable access to the element, if this node is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    fn push_text_content(&self, out: &mut String) {
        match self {
            Self::Element(element) => {
                for child in &element.children {
                    child.push_text_content(out);
                }
            }
            Self::Text(text) | Self::CData(text) => out.push_str(text),
            Self::Comment(_) | Self::ProcessingInstruction(_) => {}
        }
    }
}

/// An owned element: the unit that expansion clones and rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element name.
    pub name: QName,
    /// Attributes in source order, namespace declarations included.
    pub attributes: Vec<Attribute>,
    /// Child nodes.
    pub children: Vec<Content>,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Value of the attribute with the given namespace and local name.
    #[must_use]
    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(namespace, local))
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing one with the same namespace and local name.
    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.name.matches(name.namespace.as_deref(), &name.local))
        {
            existing.value = value;
        } else {
            self.attributes.push(Attribute::new(name, value));
        }
    }

    /// Remove and return the attribute with the given namespace and local name.
    pub fn remove_attribute(&mut self, namespace: Option<&str>, local: &str) -> Option<Attribute> {
        let index = self
            .attributes
            .iter()
            .position(|a| a.name.matches(namespace, local))?;
        Some(self.attributes.remove(index))
    }

    /// Attributes in `namespace`, in source order.
    pub fn attributes_in<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a Attribute> {
        self.attributes
            .iter()
            .filter(move |a| a.name.in_namespace(namespace))
    }

    /// Concatenated text and CDATA of all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.push_text_content(&mut out);
        }
        out
    }

    /// Append a child node.
    pub fn push(&mut self, child: Content) {
        self.children.push(child);
    }
}
