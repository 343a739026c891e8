//! Position-preserving XML document model
//!
//! Architecture: Anti-Corruption Layer - The document adapter hides the XML reader behind an owned tree
//! - Element names are namespace-resolved so rules match on URIs, never on prefixes
//! - Every element records the line/column of its name in the source text
//! - The tree is immutable once parsed and shared read-only by all consumers

pub mod ubl;

use crate::domain::{InspectorError, InspectorResult, Position};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// Namespace-qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI, `None` for names outside any namespace
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    /// Whether this name is `{namespace}local`
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }
}

/// A single attribute on an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: QName,
    pub value: String,
}

/// An element node with its source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: QName,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlNode>,
    /// Direct text content, `None` when the element has no non-blank text of its own
    pub text: Option<String>,
    pub position: Position,
}

impl XmlNode {
    fn new(name: QName, position: Position) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
            position,
        }
    }

    pub fn children(&self) -> std::slice::Iter<'_, XmlNode> {
        self.children.iter()
    }

    /// Direct children named `{namespace}local`, in document order
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name.is(namespace, local))
    }

    /// First direct child named `{namespace}local`
    pub fn child(&self, namespace: &str, local: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name.is(namespace, local))
    }

    /// All descendant elements (excluding self) in document order
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    /// Descendant elements named `{namespace}local`, in document order
    pub fn descendants_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.descendants().filter(move |d| d.name.is(namespace, local))
    }

    /// Value of the attribute with the given local name and no namespace
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Direct text of this element
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// String value: the concatenated text of this element and all its descendants
    pub fn value(&self) -> Cow<'_, str> {
        if self.children.is_empty() {
            return Cow::Borrowed(self.text.as_deref().unwrap_or(""));
        }
        let mut out = String::new();
        self.collect_text(&mut out);
        Cow::Owned(out)
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

/// Pre-order iterator over descendant elements
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, XmlNode>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(node) => {
                    self.stack.push(node.children.iter());
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// A parsed XML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: XmlNode,
}

impl Document {
    /// Parse a document from text
    pub fn parse(source: &str) -> InspectorResult<Self> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let index = LineIndex::new(source);
        let mut reader = NsReader::from_str(source);

        let mut open: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            let offset = reader.buffer_position() as usize;
            let (resolved, event) = reader
                .read_resolved_event()
                .map_err(|e| xml_error(&index, offset, e))?;
            let namespace = namespace_of(&resolved);

            match event {
                Event::Start(start) => {
                    let node = open_element(&reader, &index, namespace?, &start, offset)?;
                    open.push(node);
                }
                Event::Empty(start) => {
                    let node = open_element(&reader, &index, namespace?, &start, offset)?;
                    close_element(node, &mut open, &mut root, &index, &reader)?;
                }
                Event::End(_) => {
                    if let Some(node) = open.pop() {
                        close_element(node, &mut open, &mut root, &index, &reader)?;
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| xml_error(&index, offset, e))?;
                    if open.is_empty() && text.trim().is_empty() {
                        continue;
                    }
                    append_text(&mut open, &text, index.position(offset))?;
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    append_text(&mut open, &String::from_utf8_lossy(&data), index.position(offset))?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(InspectorError::document(
                format!("element '{}' is never closed", unclosed.name.local),
                unclosed.position,
            ));
        }

        root.map(|root| Self { root })
            .ok_or_else(|| InspectorError::document("document has no root element", Position::UNKNOWN))
    }

    /// Read and parse a document from a file
    pub fn load<P: AsRef<Path>>(path: P) -> InspectorResult<Self> {
        let source = fs::read_to_string(path)?;
        Self::parse(&source)
    }

    pub fn root(&self) -> &XmlNode {
        &self.root
    }
}

fn namespace_of(resolved: &ResolveResult<'_>) -> InspectorResult<Option<String>> {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => Ok(Some(String::from_utf8_lossy(uri).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(InspectorError::document(
            format!("unknown namespace prefix '{}'", String::from_utf8_lossy(prefix)),
            Position::UNKNOWN,
        )),
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    index: &LineIndex<'_>,
    namespace: Option<String>,
    start: &BytesStart<'_>,
    event_start: usize,
) -> InspectorResult<XmlNode> {
    if let Some(attr) = start
        .attributes()
        .flatten()
        .find(|attr| attr.value.contains(&b'<'))
    {
        return Err(InspectorError::document(
            format!(
                "attribute '{}' contains a raw '<'",
                String::from_utf8_lossy(attr.key.as_ref())
            ),
            index.position(event_start),
        ));
    }

    let position = element_position(index, reader.buffer_position() as usize);
    let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut node = XmlNode::new(QName { namespace, local }, position);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            InspectorError::document(format!("malformed attribute: {e}"), position)
        })?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = match resolved {
            ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
            _ => None,
        };
        let value = attr
            .unescape_value()
            .map_err(|e| xml_error(index, reader.buffer_position() as usize, e))?;
        node.attributes.push(XmlAttribute {
            name: QName {
                namespace,
                local: String::from_utf8_lossy(local.as_ref()).into_owned(),
            },
            value: value.into_owned(),
        });
    }

    Ok(node)
}

fn close_element(
    mut node: XmlNode,
    open: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    index: &LineIndex<'_>,
    reader: &NsReader<&[u8]>,
) -> InspectorResult<()> {
    // Whitespace-only direct text is layout, not content.
    if node.text.as_deref().is_some_and(|text| text.trim().is_empty()) {
        node.text = None;
    }
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => {
            return Err(InspectorError::document(
                "more than one root element",
                index.position(reader.buffer_position() as usize),
            ))
        }
    }
    Ok(())
}

fn append_text(open: &mut [XmlNode], text: &str, position: Position) -> InspectorResult<()> {
    match open.last_mut() {
        Some(node) => {
            node.text.get_or_insert_with(String::new).push_str(text);
            Ok(())
        }
        None => Err(InspectorError::document("text outside the root element", position)),
    }
}

/// Position of the element name for a tag that ends right before `tag_end`.
///
/// Attribute values holding a raw `<` are rejected first, so the last `<` before the end is the tag start.
fn element_position(index: &LineIndex<'_>, tag_end: usize) -> Position {
    let head = index.source.get(..tag_end).unwrap_or(index.source);
    let tag_start = head.rfind('<').unwrap_or(0);
    index.position(tag_start + 1)
}

fn xml_error(index: &LineIndex<'_>, offset: usize, error: impl std::fmt::Display) -> InspectorError {
    InspectorError::document(format!("malformed XML: {error}"), index.position(offset))
}

/// Byte offset to line/column translation
struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            source,
            line_starts,
        }
    }

    fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line - 1];
        let column = match self.source.get(start..offset) {
            Some(prefix) => prefix.chars().count(),
            None => offset - start,
        };
        Position::new(line as u32, column as u32 + 1)
    }
}
