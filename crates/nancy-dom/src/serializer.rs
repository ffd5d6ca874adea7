//! Well-formed XML serializer for owned fragments.
//!
//! Each top-level node is written on its own: any prefix an element or
//! attribute uses that is not declared by a serialized ancestor gets a
//! declaration on that element, so the output of one fragment never depends
//! on the context it was cut from.

use std::fmt::Write;

use crate::element::{Content, Element};
use crate::name::{QName, XML_NAMESPACE};

/// Serialize a sequence of nodes, concatenated without separators.
#[must_use]
pub fn serialize_nodes(nodes: &[Content]) -> String {
    let mut out = String::with_capacity(4096);
    for node in nodes {
        serialize_content(node, &mut out);
    }
    out
}

/// Serialize one node into `out`.
pub fn serialize_content(node: &Content, out: &mut String) {
    let mut scope = vec![(Some("xml".to_owned()), XML_NAMESPACE.to_owned())];
    write_content(node, &mut scope, out);
}

fn write_content(node: &Content, scope: &mut Vec<(Option<String>, String)>, out: &mut String) {
    match node {
        Content::Element(element) => write_element(element, scope, out),
        Content::Text(text) => out.push_str(&escape_text(text)),
        Content::CData(text) => {
            // "]]>" cannot appear inside a CDATA section; split it across two.
            out.push_str("<![CDATA[");
            out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]>");
        }
        Content::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Content::ProcessingInstruction(text) => {
            out.push_str("<?");
            out.push_str(text);
            out.push_str("?>");
        }
    }
}

/// Namespace bound to `prefix` in `scope`; empty string when undeclared.
fn lookup<'a>(scope: &'a [(Option<String>, String)], prefix: Option<&str>) -> &'a str {
    scope
        .iter()
        .rev()
        .find(|(p, _)| p.as_deref() == prefix)
        .map_or("", |(_, uri)| uri.as_str())
}

fn write_element(element: &Element, scope: &mut Vec<(Option<String>, String)>, out: &mut String) {
    let saved = scope.len();
    for attr in &element.attributes {
        if let Some(prefix) = attr.declared_prefix() {
            scope.push((prefix.map(str::to_owned), attr.value.clone()));
        }
    }

    let mut extra: Vec<(Option<String>, String)> = Vec::new();
    let mut require = |name: &QName, is_element: bool, scope: &mut Vec<(Option<String>, String)>| {
        let wanted = name.namespace.as_deref().unwrap_or("");
        // Unprefixed attributes are never in a namespace.
        if !is_element && name.prefix.is_none() {
            return;
        }
        let prefix = name.prefix.as_deref();
        if lookup(scope, prefix) != wanted {
            scope.push((prefix.map(str::to_owned), wanted.to_owned()));
            extra.push((prefix.map(str::to_owned), wanted.to_owned()));
        }
    };

    require(&element.name, true, scope);
    for attr in &element.attributes {
        if !attr.is_namespace_declaration() {
            require(&attr.name, false, scope);
        }
    }

    out.push('<');
    out.push_str(&element.name.qualified());
    for attr in &element.attributes {
        write!(
            out,
            r#" {}="{}""#,
            attr.name.qualified(),
            escape_attr(&attr.value)
        )
        .unwrap_or_default();
    }
    for (prefix, uri) in &extra {
        match prefix {
            Some(prefix) => write!(out, r#" xmlns:{prefix}="{}""#, escape_attr(uri)),
            None => write!(out, r#" xmlns="{}""#, escape_attr(uri)),
        }
        .unwrap_or_default();
    }

    if element.children.is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        for child in &element.children {
            write_content(child, scope, out);
        }
        write!(out, "</{}>", element.name.qualified()).unwrap_or_default();
    }

    scope.truncate(saved);
}

/// Escape text for XML content.
fn escape_text(text: &str) -> String {
    escape_xml(text, false)
}

/// Escape text for XML attribute values.
fn escape_attr(text: &str) -> String {
    escape_xml(text, true)
}

/// Escape XML special characters.
fn escape_xml(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}
