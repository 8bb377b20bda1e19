//! XML front end that builds process trees.
//!
//! Uses quick-xml's streaming API. The resulting tree only contains
//! elements: text and CDATA become the `text` of their element, comments,
//! processing instructions and the doctype are dropped, and namespace
//! declarations are stripped from the attributes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::node::{new_node, pre_order, Label, NodeInner, NodeRef};

/// Builds process trees from XML documents.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    /// Re-root the tree at the first `description` element.
    description_root: bool,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Creates a preprocessor for process models.
    pub fn new() -> Self {
        Preprocessor {
            description_root: true,
        }
    }

    /// Creates a preprocessor that keeps the document root as is.
    pub fn raw() -> Self {
        Preprocessor {
            description_root: false,
        }
    }

    /// Parses XML from a string.
    pub fn parse_str(&self, xml: &str) -> Result<NodeRef> {
        let mut reader = Reader::from_str(xml);
        // Whitespace is normalized per element below
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<NodeRef> {
        let file = File::open(path)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        self.parse_reader(&mut reader)
    }

    fn parse_reader<R: BufRead>(&self, reader: &mut Reader<R>) -> Result<NodeRef> {
        let mut root: Option<NodeRef> = None;
        // Open elements with the raw text collected so far
        let mut stack: Vec<(NodeRef, String)> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let node = self.open_element(e, reader, &stack, &mut root)?;
                    stack.push((node, String::new()));
                }
                Ok(Event::Empty(ref e)) => {
                    let node = self.open_element(e, reader, &stack, &mut root)?;
                    close_element(&node, "");
                }
                Ok(Event::End(_)) => {
                    if let Some((node, text)) = stack.pop() {
                        close_element(&node, &text);
                    }
                }
                Ok(Event::Text(ref e)) => {
                    if let Some((_, text)) = stack.last_mut() {
                        let raw = std::str::from_utf8(e.as_ref())
                            .map_err(|e| Error::Parse(e.to_string()))?;
                        let unescaped = unescape(raw).map_err(|e| Error::Parse(e.to_string()))?;
                        text.push_str(&unescaped);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if let Some((_, text)) = stack.last_mut() {
                        text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Ok(Event::GeneralRef(ref e)) => {
                    if let Some((_, text)) = stack.last_mut() {
                        if let Some(c) = e
                            .resolve_char_ref()
                            .map_err(|e| Error::Parse(e.to_string()))?
                        {
                            text.push(c);
                        } else {
                            let name = e.decode().map_err(|e| Error::Parse(e.to_string()))?;
                            let resolved = resolve_predefined_entity(&name).ok_or_else(|| {
                                Error::Parse(format!("unknown entity: &{};", name))
                            })?;
                            text.push_str(resolved);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(Event::Comment(_))
                | Ok(Event::Decl(_))
                | Ok(Event::PI(_))
                | Ok(Event::DocType(_)) => {}
                Err(e) => return Err(Error::Xml(e)),
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Parse("unexpected end of document".to_string()));
        }
        let root = root.ok_or_else(|| Error::Parse("document has no root element".to_string()))?;
        if !self.description_root || *root.borrow().label() == Label::Description {
            return Ok(root);
        }
        let description = pre_order(&root)
            .into_iter()
            .find(|n| *n.borrow().label() == Label::Description);
        match description {
            Some(description) => {
                NodeInner::detach(&description);
                Ok(description)
            }
            None => Ok(root),
        }
    }

    /// Creates the node for a start tag and attaches it to the open parent.
    fn open_element<R: BufRead>(
        &self,
        e: &BytesStart,
        reader: &Reader<R>,
        stack: &[(NodeRef, String)],
        root: &mut Option<NodeRef>,
    ) -> Result<NodeRef> {
        let tag = reader
            .decoder()
            .decode(e.local_name().as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();

        let mut attributes = BTreeMap::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("attribute error: {}", e)))?;
            let key = reader
                .decoder()
                .decode(attr.key.as_ref())
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            attributes.insert(key, value);
        }

        let node = new_node(Label::parse(&tag));
        node.borrow_mut().set_attributes(attributes);

        match stack.last() {
            Some((parent, _)) => NodeInner::append_child(parent, node.clone()),
            None if root.is_none() => *root = Some(node.clone()),
            None => return Err(Error::Parse("multiple root elements".to_string())),
        }
        Ok(node)
    }
}

/// Stores the normalized text of a finished element.
fn close_element(node: &NodeRef, raw: &str) {
    let text = normalize_whitespace(raw);
    if !text.is_empty() {
        node.borrow_mut().set_text(Some(text));
    }
}

/// Trims and collapses every run of whitespace to a single space.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a process model from a string.
pub fn parse_str(xml: &str) -> Result<NodeRef> {
    Preprocessor::new().parse_str(xml)
}

/// Parses a process model from a file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<NodeRef> {
    Preprocessor::new().parse_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process() {
        let xml = r#"<?xml version="1.0"?>
            <description xmlns="http://cpee.org/ns/description/1.0">
              <!-- setup -->
              <manipulate id="a1">
                data.x   =
                1
              </manipulate>
              <call id="a2" endpoint="bookAir"><parameters><label>Book</label></parameters></call>
            </description>"#;
        let root = parse_str(xml).unwrap();
        let root_ref = root.borrow();
        assert_eq!(*root_ref.label(), Label::Description);
        assert!(root_ref.attributes().is_empty());
        assert!(root_ref.text().is_none());
        assert_eq!(root_ref.child_count(), 2);

        let script = root_ref.child(0).unwrap().borrow();
        assert_eq!(*script.label(), Label::Manipulate);
        assert_eq!(script.attribute("id"), Some("a1"));
        assert_eq!(script.text(), Some("data.x = 1"));

        let call = root_ref.child(1).unwrap().borrow();
        assert_eq!(call.child_count(), 1);
        assert!(call.child(0).unwrap().borrow().is_property());
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = r#"<description><manipulate>if data.a &lt; 3 &amp;&amp; <![CDATA[data.b > 1]]></manipulate></description>"#;
        let root = parse_str(xml).unwrap();
        let script = root.borrow().child(0).cloned().unwrap();
        assert_eq!(script.borrow().text(), Some("if data.a < 3 && data.b > 1"));
    }

    #[test]
    fn test_description_root_extracted() {
        let xml = r#"<testset><dataelements/><description><stop/></description></testset>"#;
        let root = parse_str(xml).unwrap();
        assert_eq!(*root.borrow().label(), Label::Description);
        assert!(root.borrow().is_root());
        assert_eq!(root.borrow().child_count(), 1);

        let raw = Preprocessor::raw().parse_str(xml).unwrap();
        assert_eq!(raw.borrow().label().as_str(), "testset");
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_str("").is_err());
        assert!(parse_str("<description><call></description>").is_err());
        assert!(parse_str("<a/><b/>").is_err());
    }
}
