//! Event-driven XML parsing into the element tree

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{Attribute, Element, XmlDocument, XmlError, XmlNode};

/// Parse an XML document from a string.
///
/// Whitespace-only text between elements is dropped (it is re-created by
/// the indenting writer); comments, CDATA, and mixed text are kept.
/// Content outside the root element is ignored.
pub fn parse(input: &str) -> Result<XmlDocument, XmlError> {
    let mut reader = Reader::from_str(input);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut has_declaration = false;

    loop {
        match reader.read_event()? {
            Event::Decl(_) => {
                has_declaration = true;
            }
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                let element = stack.pop().ok_or(XmlError::UnexpectedClose(name))?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                if text.trim().is_empty() {
                    continue;
                }
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::Comment(comment) => {
                let text = String::from_utf8_lossy(&comment).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Comment(text));
                }
            }
            Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    let root = root.ok_or(XmlError::MissingRoot)?;
    Ok(XmlDocument {
        has_declaration,
        root,
    })
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());

    for attr in start.attributes() {
        let attr = attr?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push(Attribute { name, value });
    }

    Ok(element)
}

/// Hand a finished element to its parent, or record it as the root.
///
/// A second top-level element is ignored rather than rejected; manifests
/// have exactly one and the permissive stance tolerates the rest.
fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.push_element(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
