use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;

/// Attributes of a node. Values are plain JSON so that a document snapshot is
/// always serializable.
pub type Attributes = BTreeMap<String, Value>;

/// A node of the document tree: either an element with children or a run of
/// text sharing the same attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Text),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Element {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,

    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Text {
    pub data: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Node {
    /// Number of offset slots the node takes up in its parent: one for an
    /// element, one per character for text.
    pub fn offset_size(&self) -> usize {
        match self {
            Node::Element(_) => 1,
            Node::Text(text) => text.len(),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Element(element) => &element.attributes,
            Node::Text(text) => &text.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Node::Element(element) => &mut element.attributes,
            Node::Text(text) => &mut text.attributes,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self { Node::Element(element) }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self { Node::Text(text) }
}

impl From<&str> for Node {
    fn from(data: &str) -> Self { Node::Text(Text::new(data)) }
}

impl Text {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            attributes: Attributes::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Length in characters.
    pub fn len(&self) -> usize { self.data.chars().count() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Characters `[start, start + length)`.
    pub fn slice(&self, start: usize, length: usize) -> String {
        self.data.chars().skip(start).take(length).collect()
    }

    /// Split the text at the given character index, keeping the head and
    /// returning the tail with the same attributes.
    fn split_off(&mut self, at: usize) -> Text {
        let byte_index = self
            .data
            .char_indices()
            .nth(at)
            .map_or(self.data.len(), |(index, _)| index);

        Text {
            data: self.data.split_off(byte_index),
            attributes: self.attributes.clone(),
        }
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self.normalize();
        self
    }

    /// A shallow copy: same name and attributes, no children.
    #[must_use]
    pub fn empty_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
        }
    }

    /// The offset after the last child.
    pub fn max_offset(&self) -> usize { self.children.iter().map(Node::offset_size).sum() }

    pub fn has_element_children(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, Node::Element(_)))
    }

    /// Concatenated text of the element and all its descendants.
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .map(|child| match child {
                Node::Element(element) => element.text_content(),
                Node::Text(text) => text.data.clone(),
            })
            .collect()
    }

    /// Returns the child occupying the given offset slot together with the
    /// offset at which that child starts.
    pub fn child_at_offset(&self, offset: usize) -> Option<(&Node, usize)> {
        let mut start = 0;
        for child in &self.children {
            let size = child.offset_size();
            if offset < start + size {
                return Some((child, start));
            }
            start += size;
        }

        None
    }

    pub(crate) fn child_at_offset_mut(&mut self, offset: usize) -> Option<&mut Node> {
        let mut start = 0;
        for child in &mut self.children {
            let size = child.offset_size();
            if offset < start + size {
                return Some(child);
            }
            start += size;
        }

        None
    }

    /// Make sure a child boundary exists at `offset` by splitting the text
    /// node that spans it. Returns the index of the first child starting at
    /// or after `offset`.
    pub(crate) fn split_at_offset(&mut self, offset: usize) -> Result<usize, ModelError> {
        let mut start = 0;
        for index in 0..self.children.len() {
            if start == offset {
                return Ok(index);
            }

            let size = self.children[index].offset_size();
            if offset < start + size {
                let Node::Text(text) = &mut self.children[index] else {
                    return Err(ModelError::LostInvariant(format!(
                        "offset {offset} points inside a non-text node"
                    )));
                };

                let tail = text.split_off(offset - start);
                self.children.insert(index + 1, Node::Text(tail));
                return Ok(index + 1);
            }

            start += size;
        }

        if start == offset {
            Ok(self.children.len())
        } else {
            Err(ModelError::InvalidPosition(format!(
                "offset {offset} is beyond the element's end ({start})"
            )))
        }
    }

    /// Insert nodes so that the first one starts at `offset`.
    pub(crate) fn insert_at_offset(
        &mut self,
        offset: usize,
        nodes: impl IntoIterator<Item = Node>,
    ) -> Result<(), ModelError> {
        let index = self.split_at_offset(offset)?;
        self.children.splice(index..index, nodes);
        self.normalize();

        Ok(())
    }

    /// Detach the nodes occupying `[offset, offset + how_many)`.
    pub(crate) fn remove_at_offset(
        &mut self,
        offset: usize,
        how_many: usize,
    ) -> Result<Vec<Node>, ModelError> {
        let start = self.split_at_offset(offset)?;
        let end = self.split_at_offset(offset + how_many)?;
        let removed = self.children.drain(start..end).collect();
        self.normalize();

        Ok(removed)
    }

    /// Run `f` on every node fully covering `[offset, offset + how_many)`,
    /// splitting text nodes on the boundaries first.
    pub(crate) fn update_span(
        &mut self,
        offset: usize,
        how_many: usize,
        mut f: impl FnMut(&mut Node),
    ) -> Result<(), ModelError> {
        let start = self.split_at_offset(offset)?;
        let end = self.split_at_offset(offset + how_many)?;
        self.children[start..end].iter_mut().for_each(&mut f);
        self.normalize();

        Ok(())
    }

    /// Merge neighbouring text nodes with equal attributes and drop empty
    /// ones.
    pub(crate) fn normalize(&mut self) {
        let mut normalized: Vec<Node> = Vec::with_capacity(self.children.len());

        for child in self.children.drain(..) {
            match child {
                Node::Text(text) if text.is_empty() => {}
                Node::Text(text) => match normalized.last_mut() {
                    Some(Node::Text(previous)) if previous.attributes == text.attributes => {
                        previous.data.push_str(&text.data);
                    }
                    _ => normalized.push(Node::Text(text)),
                },
                element @ Node::Element(_) => normalized.push(element),
            }
        }

        self.children = normalized;
    }
}
