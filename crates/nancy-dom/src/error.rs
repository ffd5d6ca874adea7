//! Error types for XML parsing.

/// Error raised while parsing XML text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Syntax error reported by the XML reader.
    #[error("XML syntax error at byte {position}: {source}")]
    Xml {
        /// Byte offset in the parsed text.
        position: u64,
        /// Reader error.
        source: quick_xml::Error,
    },

    /// Malformed attribute.
    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error during XML parsing.
    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// Entity reference other than the predefined and numeric ones.
    #[error("undefined entity '&{0};'")]
    UndefinedEntity(String),

    /// Prefix used without a namespace declaration in scope.
    #[error("unbound namespace prefix '{0}'")]
    UnboundPrefix(String),

    /// Input ended inside an element.
    #[error("element <{0}> is not closed")]
    Unclosed(String),

    /// Input contains no element at all.
    #[error("document has no root element")]
    NoRootElement,

    /// Element or text after the root element was closed.
    #[error("content after the root element")]
    TrailingContent,
}
