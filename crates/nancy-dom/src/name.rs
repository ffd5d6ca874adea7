//! Qualified names and attributes.

use std::fmt;

/// Namespace bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of `xmlns` and `xmlns:*` declaration attributes.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Namespace-qualified name of an element or attribute.
///
/// `prefix` is kept only for serialization; comparisons that matter for
/// queries go through `namespace` and `local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Prefix as written in the source, if any.
    pub prefix: Option<String>,
    /// Local part of the name.
    pub local: String,
    /// Resolved namespace URI, if any.
    pub namespace: Option<String>,
}

impl QName {
    /// Name without prefix or namespace.
    #[must_use]
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: None,
        }
    }

    /// Prefixed name bound to `namespace`.
    #[must_use]
    pub fn prefixed(
        prefix: impl Into<String>,
        local: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// True if the name has the given namespace and local part.
    #[must_use]
    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local == local
    }

    /// True if the name is in `namespace`.
    #[must_use]
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }

    /// The name as written: `prefix:local` or `local`.
    #[must_use]
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{prefix}:")?;
        }
        f.write_str(&self.local)
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name.
    pub name: QName,
    /// Attribute value, unescaped.
    pub value: String,
}

impl Attribute {
    /// Create an attribute.
    #[must_use]
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    /// True for `xmlns` and `xmlns:*` declarations.
    #[must_use]
    pub fn is_namespace_declaration(&self) -> bool {
        self.name.in_namespace(XMLNS_NAMESPACE)
    }

    /// The prefix declared by a namespace declaration.
    ///
    /// Returns `Some(None)` for a default namespace declaration and `None` for
    /// ordinary attributes.
    #[must_use]
    pub fn declared_prefix(&self) -> Option<Option<&str>> {
        if !self.is_namespace_declaration() {
            return None;
        }
        Some(self.name.prefix.as_ref().map(|_| self.name.local.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        assert_eq!(QName::local("p").qualified(), "p");
        assert_eq!(QName::prefixed("nc", "x", "urn:nc").qualified(), "nc:x");
        assert_eq!(QName::prefixed("nc", "x", "urn:nc").to_string(), "nc:x");
    }

    #[test]
    fn test_matches_ignores_prefix() {
        let name = QName::prefixed("a", "x", "urn:nc");

        assert!(name.matches(Some("urn:nc"), "x"));
        assert!(!name.matches(None, "x"));
        assert!(!name.matches(Some("urn:nc"), "y"));
    }

    #[test]
    fn test_declared_prefix() {
        let default = Attribute::new(
            QName {
                prefix: None,
                local: "xmlns".to_owned(),
                namespace: Some(XMLNS_NAMESPACE.to_owned()),
            },
            "http://www.w3.org/1999/xhtml",
        );
        let prefixed = Attribute::new(QName::prefixed("xmlns", "nc", XMLNS_NAMESPACE), "urn:nc");
        let plain = Attribute::new(QName::local("href"), "/");

        assert_eq!(default.declared_prefix(), Some(None));
        assert_eq!(prefixed.declared_prefix(), Some(Some("nc")));
        assert_eq!(plain.declared_prefix(), None);
    }
}
