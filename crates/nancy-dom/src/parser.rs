//! XML parser with namespace resolution.
//!
//! Reads a complete document with `quick-xml` into an owned [`Element`].
//! Prefixes are resolved against the caller's initial bindings plus the
//! `xmlns` declarations found in the text, so a fragment can use a well-known
//! prefix such as `nc:` without declaring it.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::element::{Content, Element};
use crate::error::ParseError;
use crate::name::{Attribute, QName, XML_NAMESPACE, XMLNS_NAMESPACE};

/// Prefix bindings in scope; later entries shadow earlier ones.
///
/// A `None` prefix is the default namespace; an empty URI undeclares it.
struct Scope {
    bindings: Vec<(Option<String>, String)>,
}

impl Scope {
    fn new(initial: &[(&str, &str)]) -> Self {
        let mut bindings = vec![(Some("xml".to_owned()), XML_NAMESPACE.to_owned())];
        bindings.extend(
            initial
                .iter()
                .map(|(prefix, uri)| (Some((*prefix).to_owned()), (*uri).to_owned())),
        );
        Self { bindings }
    }

    fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}

/// Split `prefix:local` into its parts.
fn split_name(raw: &str) -> (Option<&str>, &str) {
    match raw.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, raw),
    }
}

/// Parse `xml` into its root element.
///
/// `namespaces` lists `(prefix, uri)` bindings that are in scope before the
/// first element, in addition to the built-in `xml` prefix.
///
/// # Errors
///
/// Returns [`ParseError`] for malformed XML, undefined entities, unbound
/// prefixes, unclosed elements, or content outside the single root element.
pub fn parse_element(xml: &str, namespaces: &[(&str, &str)]) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut scope = Scope::new(namespaces);
    // Open elements with the scope length to restore when they close.
    let mut stack: Vec<(Element, usize)> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|source| ParseError::Xml {
            position: reader.error_position(),
            source,
        })?;
        match event {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(ParseError::TrailingContent);
                }
                let saved = scope.bindings.len();
                let element = decode_element(&reader, &e, &mut scope)?;
                stack.push((element, saved));
            }
            Event::Empty(e) => {
                if root.is_some() {
                    return Err(ParseError::TrailingContent);
                }
                let saved = scope.bindings.len();
                let element = decode_element(&reader, &e, &mut scope)?;
                scope.bindings.truncate(saved);
                close(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                // quick-xml has already checked that the end tag matches.
                if let Some((element, saved)) = stack.pop() {
                    scope.bindings.truncate(saved);
                    close(&mut stack, &mut root, element);
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                append(&mut stack, &root, Content::Text(text), true)?;
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?.into_owned();
                let text =
                    decode_entity(&entity).ok_or_else(|| ParseError::UndefinedEntity(entity))?;
                append(&mut stack, &root, Content::Text(text), false)?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                append(&mut stack, &root, Content::CData(text), false)?;
            }
            Event::Comment(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                if !stack.is_empty() {
                    append(&mut stack, &root, Content::Comment(text), false)?;
                }
            }
            Event::PI(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                if !stack.is_empty() {
                    append(&mut stack, &root, Content::ProcessingInstruction(text), false)?;
                }
            }
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some((open, _)) = stack.pop() {
        return Err(ParseError::Unclosed(open.name.qualified()));
    }
    root.ok_or(ParseError::NoRootElement)
}

/// Attach a finished element to its parent, or make it the root.
fn close(stack: &mut [(Element, usize)], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some((parent, _)) => parent.push(Content::Element(element)),
        None => *root = Some(element),
    }
}

/// Append a non-element node to the innermost open element.
///
/// Outside the root only whitespace text is tolerated.
fn append(
    stack: &mut [(Element, usize)],
    root: &Option<Element>,
    content: Content,
    whitespace_ok: bool,
) -> Result<(), ParseError> {
    let Some((parent, _)) = stack.last_mut() else {
        if whitespace_ok
            && let Content::Text(text) = &content
            && text.trim().is_empty()
        {
            return Ok(());
        }
        return Err(if root.is_some() {
            ParseError::TrailingContent
        } else {
            ParseError::NoRootElement
        });
    };
    if let (Content::Text(text), Some(Content::Text(previous))) =
        (&content, parent.children.last_mut())
    {
        previous.push_str(text);
        return Ok(());
    }
    parent.push(content);
    Ok(())
}

/// Decode a start tag, pushing its namespace declarations onto `scope`.
fn decode_element<R>(
    reader: &Reader<R>,
    e: &BytesStart,
    scope: &mut Scope,
) -> Result<Element, ParseError> {
    let mut raw_attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = reader.decoder().decode(attr.key.as_ref())?.into_owned();
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        if key == "xmlns" {
            scope.bindings.push((None, value.clone()));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.bindings.push((Some(prefix.to_owned()), value.clone()));
        }
        raw_attributes.push((key, value));
    }

    let raw_name = reader.decoder().decode(e.name().as_ref())?.into_owned();
    let (prefix, local) = split_name(&raw_name);
    let namespace = scope.resolve(prefix).map(str::to_owned);
    if let Some(prefix) = prefix
        && namespace.is_none()
    {
        return Err(ParseError::UnboundPrefix(prefix.to_owned()));
    }
    let name = QName {
        prefix: prefix.map(str::to_owned),
        local: local.to_owned(),
        namespace,
    };

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let name = if key == "xmlns" {
            QName {
                prefix: None,
                local: key,
                namespace: Some(XMLNS_NAMESPACE.to_owned()),
            }
        } else {
            match split_name(&key) {
                (Some("xmlns"), local) => QName::prefixed("xmlns", local, XMLNS_NAMESPACE),
                (Some(prefix), local) => {
                    // Unprefixed attributes never take the default namespace.
                    let uri = scope
                        .resolve(Some(prefix))
                        .ok_or_else(|| ParseError::UnboundPrefix(prefix.to_owned()))?;
                    QName::prefixed(prefix, local, uri)
                }
                (None, local) => QName::local(local),
            }
        };
        attributes.push(Attribute::new(name, value));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

/// Decode predefined and numeric entity references.
fn decode_entity(entity: &str) -> Option<String> {
    let text = match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            char::from_u32(code?)?.to_string()
        }
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const NC: &str = "urn:nc";

    fn parse(xml: &str) -> Element {
        parse_element(xml, &[("nc", NC)]).unwrap()
    }

    #[test]
    fn test_parse_simple_element() {
        let root = parse("<page><p>Hello</p></page>");

        assert_eq!(root.name, QName::local("page"));
        let p = root.children[0].as_element().unwrap();
        assert_eq!(p.name.local, "p");
        assert_eq!(p.text_content(), "Hello");
    }

    #[test]
    fn test_parse_predefined_prefix() {
        let root = parse("<page><nc:x>header</nc:x></page>");
        let x = root.children[0].as_element().unwrap();

        assert_eq!(x.name, QName::prefixed("nc", "x", NC));
        assert_eq!(x.text_content(), "header");
    }

    #[test]
    fn test_parse_prefixed_attribute() {
        let root = parse(r#"<page><a nc:href="$path" class="link"/></page>"#);
        let a = root.children[0].as_element().unwrap();

        assert_eq!(a.attribute(Some(NC), "href"), Some("$path"));
        assert_eq!(a.attribute(None, "class"), Some("link"));
    }

    #[test]
    fn test_parse_default_namespace_and_declarations() {
        let root = parse(r#"<page><html xmlns="http://www.w3.org/1999/xhtml"><body/></html></page>"#);
        let html = root.children[0].as_element().unwrap();
        let body = html.children[0].as_element().unwrap();

        assert_eq!(
            html.name.namespace.as_deref(),
            Some("http://www.w3.org/1999/xhtml")
        );
        assert_eq!(
            body.name.namespace.as_deref(),
            Some("http://www.w3.org/1999/xhtml")
        );
        assert!(html.attributes[0].is_namespace_declaration());
        assert_eq!(root.name.namespace, None);
    }

    #[test]
    fn test_parse_entities_merge_into_text() {
        let root = parse("<p>a &lt; b &amp;&#65;&#x42;</p>");

        assert_eq!(root.children, vec![Content::Text("a < b &AB".to_owned())]);
    }

    #[test]
    fn test_parse_cdata_comment_pi() {
        let root = parse("<p><![CDATA[<raw>]]><!-- note --><?php echo ?></p>");

        assert_eq!(
            root.children,
            vec![
                Content::CData("<raw>".to_owned()),
                Content::Comment(" note ".to_owned()),
                Content::ProcessingInstruction("php echo ".to_owned()),
            ]
        );
    }

    #[test]
    fn test_parse_undefined_entity_fails() {
        let err = parse_element("<p>&nbsp;</p>", &[]).unwrap_err();

        assert!(matches!(err, ParseError::UndefinedEntity(ref e) if e == "nbsp"));
    }

    #[test]
    fn test_parse_unbound_prefix_fails() {
        let err = parse_element("<p><x:y/></p>", &[]).unwrap_err();

        assert!(matches!(err, ParseError::UnboundPrefix(ref p) if p == "x"));
    }

    #[test]
    fn test_parse_mismatched_tag_fails() {
        assert!(parse_element("<p><b></p></b>", &[]).is_err());
    }

    #[test]
    fn test_parse_unclosed_fails() {
        assert!(parse_element("<p><b>", &[]).is_err());
    }

    #[test]
    fn test_parse_empty_fails() {
        let err = parse_element("  ", &[]).unwrap_err();

        assert!(matches!(err, ParseError::NoRootElement));
    }

    #[test]
    fn test_parse_trailing_element_fails() {
        let err = parse_element("<a/><b/>", &[]).unwrap_err();

        assert!(matches!(err, ParseError::TrailingContent));
    }

    #[test]
    fn test_namespace_scope_ends_with_element() {
        let err = parse_element(r#"<r><a xmlns:p="urn:p"/><p:b/></r>"#, &[]).unwrap_err();

        assert!(matches!(err, ParseError::UnboundPrefix(_)));
    }
}
