use crate::error::{Error, QueryError, Result};
use crate::hocr::query::Query;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;

/// Stable handle to a node of a [`Document`].
///
/// Nodes are never removed from a document, so a handle obtained during
/// selection stays valid while the Annotation Store appends new content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    self_closing: bool,
}

impl Element {
    pub fn new(name: &str, attributes: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            self_closing: false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn from_start(start: &BytesStart<'_>, self_closing: bool) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::parse(format!("<{}>: {}", name, e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            self_closing,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Element(Element),
    Text(String),
    Comment(String),
    CData(String),
    /// Processing instruction, including the XML declaration. Stored without `<?` `?>`.
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An hOCR document held as an arena of nodes.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }
}

impl Document {
    /// Parse a complete document. Mismatched or unclosed tags are parse errors.
    pub fn parse(input: &str) -> Result<Self> {
        let mut doc = Self::default();
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(false);

        let mut open = vec![doc.root()];

        loop {
            let parent = *open.last().unwrap_or(&NodeId(0));
            match reader.read_event()? {
                Event::Start(e) => {
                    let element = Element::from_start(&e, false)?;
                    let id = doc.push(parent, NodeKind::Element(element));
                    open.push(id);
                }
                Event::Empty(e) => {
                    let element = Element::from_start(&e, true)?;
                    doc.push(parent, NodeKind::Element(element));
                }
                Event::End(_) => {
                    if open.len() <= 1 {
                        return Err(Error::parse(format!(
                            "unexpected closing tag at byte {}",
                            reader.buffer_position()
                        )));
                    }
                    open.pop();
                }
                Event::Text(e) => {
                    let text = e.unescape()?.into_owned();
                    doc.push(parent, NodeKind::Text(text));
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.push(parent, NodeKind::CData(text));
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.push(parent, NodeKind::Comment(text));
                }
                Event::Decl(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.push(parent, NodeKind::ProcessingInstruction(text));
                }
                Event::PI(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.push(parent, NodeKind::ProcessingInstruction(text));
                }
                Event::DocType(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.push(parent, NodeKind::DocType(text));
                }
                Event::Eof => break,
            }
        }

        if open.len() > 1 {
            let unclosed = open
                .last()
                .and_then(|id| doc.element(*id))
                .map(|e| e.name.clone())
                .unwrap_or_default();
            return Err(Error::parse(format!("unclosed element <{}>", unclosed)));
        }

        if doc.root_element().is_none() {
            return Err(Error::parse("document has no root element"));
        }

        Ok(doc)
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// The virtual root above the document element.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|id| self.element(*id).is_some())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root_element().is_none()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attribute(name)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Text(t) | NodeKind::CData(t) => Some(t),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.element(*c).is_some())
    }

    /// Concatenation of the text nodes that are direct children of `id`.
    pub fn direct_text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|c| self.text(*c))
            .collect()
    }

    /// All text below `id`, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|d| self.text(d))
            .collect()
    }

    /// Descendants of `id` (excluding `id`) in document order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Position of every node in document order, indexed by `NodeId`.
    pub(crate) fn document_order(&self) -> Vec<usize> {
        let mut order = vec![usize::MAX; self.nodes.len()];
        order[0] = 0;
        for (pos, id) in self.descendants(self.root()).enumerate() {
            order[id.0] = pos + 1;
        }
        order
    }

    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        self.push(parent, NodeKind::Element(element))
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    /// Evaluate a query expression against the whole document.
    pub fn select(&self, query: &str) -> std::result::Result<Vec<NodeId>, QueryError> {
        Ok(Query::parse(query)?.select(self))
    }

    /// Display path of a node, e.g. `/html/body/span[2]`.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let segment = match &self.nodes[current.0].kind {
                NodeKind::Element(e) => {
                    let same_name: Vec<NodeId> = self
                        .child_elements(parent)
                        .filter(|c| self.element(*c).map(|s| s.name == e.name).unwrap_or(false))
                        .collect();
                    if same_name.len() > 1 {
                        let pos = same_name.iter().position(|c| *c == current).unwrap_or(0);
                        format!("{}[{}]", e.name, pos + 1)
                    } else {
                        e.name.clone()
                    }
                }
                NodeKind::Text(_) | NodeKind::CData(_) => "text()".to_string(),
                NodeKind::Comment(_) => "comment()".to_string(),
                _ => "node()".to_string(),
            };
            segments.push(segment);
            current = parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Serialize the document back to markup.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root()) {
            self.write_node(*child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Root => {}
            NodeKind::Element(e) => {
                out.push('<');
                out.push_str(&e.name);
                for (k, v) in &e.attributes {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape(v.as_str()));
                    out.push('"');
                }
                if node.children.is_empty() && e.self_closing {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in &node.children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(&e.name);
                out.push('>');
            }
            NodeKind::Text(t) => out.push_str(&partial_escape(t.as_str())),
            NodeKind::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            NodeKind::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            NodeKind::ProcessingInstruction(t) => {
                out.push_str("<?");
                out.push_str(t);
                out.push_str("?>");
            }
            NodeKind::DocType(t) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(t.trim_start());
                out.push('>');
            }
        }
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(next).iter().rev().copied());
        Some(next)
    }
}
