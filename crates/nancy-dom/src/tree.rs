//! Arena-backed document tree.
//!
//! Nodes are appended in pre-order, so comparing two [`NodeId`]s compares
//! their document positions. The tree is immutable once built; every
//! expansion works on owned clones obtained through
//! [`DocumentTree::to_element`] and [`DocumentTree::to_content`].

use crate::element::{Content, Element};
use crate::name::{Attribute, QName};

/// Index of a node in a [`DocumentTree`].
///
/// Ordering follows document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Id of the node at `index` in the arena.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node; always [`DocumentTree::root`].
    Document,
    /// Element with its attributes.
    Element {
        /// Element name.
        name: QName,
        /// Attributes in source order.
        attributes: Vec<Attribute>,
    },
    /// Character data.
    Text(String),
    /// Comment body.
    Comment(String),
    /// CDATA section body.
    CData(String),
    /// Processing instruction body.
    ProcessingInstruction(String),
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Immutable document tree.
#[derive(Debug)]
pub struct DocumentTree {
    nodes: Vec<NodeData>,
}

impl DocumentTree {
    /// The document node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The first element child of the document node.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.is_element(id))
    }

    /// Number of nodes, the document node included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the tree holds only the document node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Payload of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Parent of a node; `None` for the document node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children of a node in document order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// True for element nodes.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    /// Name of an element node.
    #[must_use]
    pub fn element_name(&self, id: NodeId) -> Option<&QName> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Attributes of an element node; empty for other kinds.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Value of the attribute with the given namespace and local name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name.matches(namespace, local))
            .map(|a| a.value.as_str())
    }

    /// Ancestors from the parent up to the document node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&n| self.parent(n))
    }

    /// All descendants in document order, excluding `id` itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// String value: concatenated text and CDATA of the node and its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text(text) | NodeKind::CData(text) => text.clone(),
            NodeKind::Comment(text) | NodeKind::ProcessingInstruction(text) => text.clone(),
            NodeKind::Document | NodeKind::Element { .. } => {
                let mut out = String::new();
                for node in self.descendants(id) {
                    if let NodeKind::Text(text) | NodeKind::CData(text) = self.kind(node) {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }

    /// Deep-clone an element subtree into an owned [`Element`].
    ///
    /// Returns `None` if `id` is not an element.
    #[must_use]
    pub fn to_element(&self, id: NodeId) -> Option<Element> {
        match self.to_content(id)? {
            Content::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Deep-clone any non-document node into an owned [`Content`].
    #[must_use]
    pub fn to_content(&self, id: NodeId) -> Option<Content> {
        let content = match self.kind(id) {
            NodeKind::Document => return None,
            NodeKind::Element { name, attributes } => Content::Element(Element {
                name: name.clone(),
                attributes: attributes.clone(),
                children: self
                    .children(id)
                    .iter()
                    .filter_map(|&child| self.to_content(child))
                    .collect(),
            }),
            NodeKind::Text(text) => Content::Text(text.clone()),
            NodeKind::Comment(text) => Content::Comment(text.clone()),
            NodeKind::CData(text) => Content::CData(text.clone()),
            NodeKind::ProcessingInstruction(text) => Content::ProcessingInstruction(text.clone()),
        };
        Some(content)
    }
}

/// Incremental builder for a [`DocumentTree`].
///
/// Keeps a stack of open elements; every append goes to the innermost one.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    open: Vec<NodeId>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Create a builder holding only the document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            open: vec![NodeId(0)],
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(NodeId(0))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.current();
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Open a new element under the current one and make it current.
    pub fn start_element(&mut self, name: QName, attributes: Vec<Attribute>) -> NodeId {
        let id = self.push_node(NodeKind::Element { name, attributes });
        self.open.push(id);
        id
    }

    /// Close the current element. The document node is never closed.
    pub fn end_element(&mut self) {
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    /// Append text, merging with a directly preceding text node.
    pub fn append_text(&mut self, text: &str) {
        let parent = self.current();
        if let Some(&last) = self.nodes[parent.0].children.last()
            && let NodeKind::Text(existing) = &mut self.nodes[last.0].kind
        {
            existing.push_str(text);
            return;
        }
        self.push_node(NodeKind::Text(text.to_owned()));
    }

    /// Append an owned node and its subtree under the current element.
    ///
    /// Returns the id of the appended node.
    pub fn append_content(&mut self, content: &Content) -> NodeId {
        match content {
            Content::Element(element) => {
                let id = self.start_element(element.name.clone(), element.attributes.clone());
                for child in &element.children {
                    self.append_content(child);
                }
                self.end_element();
                id
            }
            Content::Text(text) => self.push_node(NodeKind::Text(text.clone())),
            Content::Comment(text) => self.push_node(NodeKind::Comment(text.clone())),
            Content::CData(text) => self.push_node(NodeKind::CData(text.clone())),
            Content::ProcessingInstruction(text) => {
                self.push_node(NodeKind::ProcessingInstruction(text.clone()))
            }
        }
    }

    /// Set an attribute on an element created by this builder.
    ///
    /// Replaces an attribute with the same namespace and local name. Does
    /// nothing if `id` is not an element.
    pub fn set_attribute(&mut self, id: NodeId, attribute: Attribute) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            if let Some(existing) = attributes.iter_mut().find(|a| {
                a.name
                    .matches(attribute.name.namespace.as_deref(), &attribute.name.local)
            }) {
                existing.value = attribute.value;
            } else {
                attributes.push(attribute);
            }
        }
    }

    /// Finish building.
    #[must_use]
    pub fn finish(self) -> DocumentTree {
        DocumentTree { nodes: self.nodes }
    }
}
