//! XML document model for Nancy.
//!
//! Two representations of the same data live here:
//!
//! - [`DocumentTree`]: an arena of nodes built once per source tree and read
//!   concurrently by every expansion. Node ids are allocated in document order.
//! - [`Element`] / [`Content`]: owned fragments produced by deep-cloning a
//!   subtree with [`DocumentTree::to_element`]. Expansion rewrites these in
//!   place and hands them to the serializer.
//!
//! [`parse_element`] reads XML text with `quick-xml`; [`serialize_nodes`]
//! writes fragments back out as well-formed XML.

mod element;
mod error;
mod name;
mod parser;
mod serializer;
mod tree;

pub use element::{Content, Element};
pub use error::ParseError;
pub use name::{Attribute, QName, XML_NAMESPACE, XMLNS_NAMESPACE};
pub use parser::parse_element;
pub use serializer::{serialize_content, serialize_nodes};
pub use tree::{DocumentTree, NodeId, NodeKind, TreeBuilder};
