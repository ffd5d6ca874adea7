//! Values produced by query evaluation.

use nancy_dom::{Attribute, DocumentTree, NodeId, QName};

/// One item of a query result sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A node of the tree (element, text, comment, ... or the document node).
    Node(NodeId),
    /// The `index`-th attribute of element `owner`.
    Attribute {
        /// Element carrying the attribute.
        owner: NodeId,
        /// Position in the owner's attribute list.
        index: usize,
    },
    /// A string.
    String(String),
    /// A double.
    Number(f64),
    /// A boolean.
    Boolean(bool),
}

impl Item {
    /// The node id if this is a tree node (not an attribute).
    #[must_use]
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// True for tree nodes and attributes.
    #[must_use]
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_) | Self::Attribute { .. })
    }

    /// The attribute this item refers to, if any.
    #[must_use]
    pub fn attribute<'t>(&self, tree: &'t DocumentTree) -> Option<&'t Attribute> {
        match self {
            Self::Attribute { owner, index } => tree.attributes(*owner).get(*index),
            _ => None,
        }
    }

    /// Element or attribute name; `None` for other items.
    #[must_use]
    pub fn name<'t>(&self, tree: &'t DocumentTree) -> Option<&'t QName> {
        match self {
            Self::Node(id) => tree.element_name(*id),
            Self::Attribute { .. } => self.attribute(tree).map(|a| &a.name),
            _ => None,
        }
    }

    /// String value of the item.
    #[must_use]
    pub fn string_value(&self, tree: &DocumentTree) -> String {
        match self {
            Self::Node(id) => tree.text_content(*id),
            Self::Attribute { .. } => self
                .attribute(tree)
                .map(|a| a.value.clone())
                .unwrap_or_default(),
            Self::String(value) => value.clone(),
            Self::Number(value) => format_number(*value),
            Self::Boolean(value) => value.to_string(),
        }
    }

    /// Document-order key for nodes; attributes sort right after their owner.
    pub(crate) fn order_key(&self) -> Option<(usize, usize)> {
        match self {
            Self::Node(id) => Some((id.index(), 0)),
            Self::Attribute { owner, index } => Some((owner.index(), index + 1)),
            _ => None,
        }
    }
}

/// Format a number the way XPath casts a double to a string.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if value == 0.0 {
        "0".to_owned()
    } else {
        value.to_string()
    }
}

/// Sort node items into document order and drop duplicates.
pub(crate) fn sort_document_order(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by_key(Item::order_key);
    items.dedup_by_key(|item| item.order_key());
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_attributes_sort_between_owner_and_children() {
        let owner = NodeId::from_index(3);
        let child = NodeId::from_index(4);
        let items = vec![
            Item::Node(child),
            Item::Attribute { owner, index: 1 },
            Item::Node(owner),
            Item::Attribute { owner, index: 0 },
            Item::Node(child),
        ];

        assert_eq!(
            sort_document_order(items),
            vec![
                Item::Node(owner),
                Item::Attribute { owner, index: 0 },
                Item::Attribute { owner, index: 1 },
                Item::Node(child),
            ]
        );
    }
}
