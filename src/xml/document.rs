use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;

use quick_xml::escape::unescape;
use quick_xml::events::attributes::Attribute as QuickAttribute;
use quick_xml::events::{BytesCData, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use super::escape::{
    escape_attribute_value, escape_text, normalize_attribute_whitespace, normalize_line_endings,
};
use super::{Result, XmlError};

/// Namespace bound to the `xml` prefix by definition.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Deepest element nesting accepted by [`Document::parse`].
const MAX_DEPTH: usize = 512;

/// Prefix to namespace-URI bindings in scope at some point of a tree.
/// The default namespace uses the empty prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces(BTreeMap<String, String>);

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `uri`; an empty `uri` removes the binding.
    pub fn declare(&mut self, prefix: &str, uri: &str) {
        if uri.is_empty() {
            self.0.remove(prefix);
        } else {
            self.0.insert(prefix.to_owned(), uri.to_owned());
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.0.get(prefix).map(String::as_str)
    }

    /// Bindings in scope inside `element`, given the bindings in scope at its parent.
    pub fn nested(&self, element: &Element) -> Self {
        let mut scope = self.clone();
        for (prefix, uri) in element.namespace_declarations() {
            scope.declare(prefix, uri);
        }
        scope
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    /// Prefix of a qualified attribute name; `None` for unprefixed names.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// The declared prefix when this attribute is a namespace declaration
    /// (`""` for `xmlns`).
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.name == "xmlns" {
            Some("")
        } else {
            self.name.strip_prefix("xmlns:")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>, skip_blank_text: bool) -> Result<()> {
        match self {
            Node::Element(element) => element.write_node(writer, skip_blank_text)?,
            Node::Text(text) => {
                if !(skip_blank_text && text.trim().is_empty()) {
                    let escaped = escape_text(text);
                    writer.write_event(Event::Text(BytesText::from_escaped(escaped.as_str())))?;
                }
            }
            Node::CData(data) => writer.write_event(Event::CData(BytesCData::new(data.as_str())))?,
            Node::Comment(comment) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?
            }
            Node::ProcessingInstruction(content) => {
                writer.write_event(Event::PI(BytesPI::new(content.as_str())))?
            }
        }
        Ok(())
    }
}

/// An element with its qualified name, resolved namespace URI, attributes in
/// document order (namespace declarations included) and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Whether this element is `{namespace}local_name`.
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace() == Some(namespace) && self.local_name() == local_name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of the attribute with the given qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|attribute| {
            attribute
                .declared_prefix()
                .map(|prefix| (prefix, attribute.value.as_str()))
        })
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First direct child element named `{namespace}local_name`.
    pub fn find_child(&self, namespace: &str, local_name: &str) -> Option<&Element> {
        self.child_elements()
            .find(|child| child.is(namespace, local_name))
    }

    /// Position among `children()` of the first direct child element named
    /// `{namespace}local_name`.
    pub fn position_of_child(&self, namespace: &str, local_name: &str) -> Option<usize> {
        self.children.iter().position(|node| {
            node.as_element()
                .is_some_and(|child| child.is(namespace, local_name))
        })
    }

    pub fn child_element(&self, index: usize) -> Option<&Element> {
        self.children.get(index).and_then(Node::as_element)
    }

    pub fn child_element_mut(&mut self, index: usize) -> Option<&mut Element> {
        match self.children.get_mut(index) {
            Some(Node::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Detach the child at `index`.
    pub fn remove_child(&mut self, index: usize) -> Option<Node> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    pub fn append_child(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Concatenated text and CDATA content of the direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) | Node::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serialize this element and its subtree, without an XML declaration.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_node(&mut writer, false)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    pub(super) fn write_node<W: Write>(
        &self,
        writer: &mut Writer<W>,
        skip_blank_text: bool,
    ) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for attribute in &self.attributes {
            start.push_attribute(QuickAttribute {
                key: QName(attribute.name.as_bytes()),
                value: Cow::Owned(escape_attribute_value(&attribute.value).into_bytes()),
            });
        }
        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            child.write_to(writer, skip_blank_text)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }

    fn from_start(start: &BytesStart, parent_scope: &Namespaces) -> Result<(Self, Namespaces)> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = std::str::from_utf8(attribute.key.as_ref())?.to_owned();
            let raw = std::str::from_utf8(&attribute.value)?;
            let value = unescape(&normalize_attribute_whitespace(raw))?.into_owned();
            attributes.push(Attribute { name: key, value });
        }

        let mut element = Element {
            name,
            namespace: None,
            attributes,
            children: Vec::new(),
        };
        let scope = parent_scope.nested(&element);
        let prefix = element.prefix().unwrap_or("");
        element.namespace = match scope.get(prefix) {
            Some(uri) => Some(uri.to_owned()),
            None if prefix.is_empty() => None,
            None => return Err(XmlError::UnboundPrefix(prefix.to_owned())),
        };
        Ok((element, scope))
    }
}

/// A parsed document. The XML declaration and prolog comments and processing
/// instructions are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);
        reader.config_mut().expand_empty_elements = true;

        let mut stack: Vec<(Element, Namespaces)> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Decl(_) => {}
                Event::DocType(_) => return Err(XmlError::DoctypeForbidden),
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(XmlError::Structure(
                            "element found after the document element".into(),
                        ));
                    }
                    check_depth(stack.len())?;
                    let empty = Namespaces::new();
                    let parent_scope = stack.last().map_or(&empty, |(_, scope)| scope);
                    let (element, scope) = Element::from_start(&start, parent_scope)?;
                    stack.push((element, scope));
                }
                Event::Empty(start) => {
                    check_depth(stack.len())?;
                    let empty = Namespaces::new();
                    let parent_scope = stack.last().map_or(&empty, |(_, scope)| scope);
                    let (element, _) = Element::from_start(&start, parent_scope)?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let (element, _) = stack
                        .pop()
                        .ok_or_else(|| XmlError::Structure("unexpected closing tag".into()))?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let raw = std::str::from_utf8(&text)?;
                    let value = unescape(&normalize_line_endings(raw))?.into_owned();
                    match stack.last_mut() {
                        Some((parent, _)) => parent.children.push(Node::Text(value)),
                        None if value.trim().is_empty() => {}
                        None => {
                            return Err(XmlError::Structure(
                                "text content outside the document element".into(),
                            ));
                        }
                    }
                }
                Event::CData(data) => {
                    let value = normalize_line_endings(std::str::from_utf8(&data)?).into_owned();
                    match stack.last_mut() {
                        Some((parent, _)) => parent.children.push(Node::CData(value)),
                        None => {
                            return Err(XmlError::Structure(
                                "CDATA section outside the document element".into(),
                            ));
                        }
                    }
                }
                Event::Comment(comment) => {
                    if let Some((parent, _)) = stack.last_mut() {
                        let value = std::str::from_utf8(&comment)?;
                        parent
                            .children
                            .push(Node::Comment(normalize_line_endings(value).into_owned()));
                    }
                }
                Event::PI(pi) => {
                    if let Some((parent, _)) = stack.last_mut() {
                        let value = std::str::from_utf8(&pi)?;
                        parent
                            .children
                            .push(Node::ProcessingInstruction(value.to_owned()));
                    }
                }
                Event::Eof => break,
            }
        }

        if let Some((open, _)) = stack.last() {
            return Err(XmlError::Structure(format!(
                "unclosed element '{}'",
                open.name
            )));
        }
        let root = root.ok_or_else(|| XmlError::Structure("document has no root element".into()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }
}

/// Every walk over the tree recurses once per level.
fn check_depth(open: usize) -> Result<()> {
    if open >= MAX_DEPTH {
        return Err(XmlError::Structure(format!(
            "elements nested deeper than {MAX_DEPTH} levels"
        )));
    }
    Ok(())
}

fn close_element(
    stack: &mut [(Element, Namespaces)],
    root: &mut Option<Element>,
    element: Element,
) -> Result<()> {
    match stack.last_mut() {
        Some((parent, _)) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(XmlError::Structure(
                "more than one document element".into(),
            ));
        }
    }
    Ok(())
}
