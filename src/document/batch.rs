use serde_json::Value;

use crate::{
    delta::Delta,
    document::Document,
    errors::ModelError,
    model::{Attributes, Element, Node, Position, Range, Text},
};

/// Editing commands. Every call builds its delta against the document's
/// current version and applies it before returning, so calls can be chained
/// and each one sees the result of the previous one.
#[derive(Debug)]
pub struct Batch<'a> {
    document: &'a mut Document,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(document: &'a mut Document) -> Self { Self { document } }

    pub fn document(&self) -> &Document { self.document }

    fn apply(&mut self, delta: Delta) -> Result<&mut Self, ModelError> {
        self.document.apply_delta(delta)?;
        Ok(self)
    }

    pub fn insert(&mut self, position: Position, nodes: Vec<Node>) -> Result<&mut Self, ModelError> {
        let delta = Delta::insert(position, nodes, self.document.version());
        self.apply(delta)
    }

    pub fn insert_text(
        &mut self,
        position: &Position,
        text: &str,
        attributes: Attributes,
    ) -> Result<&mut Self, ModelError> {
        if text.is_empty() {
            return Ok(self);
        }

        let node = Node::Text(Text {
            data: text.to_owned(),
            attributes,
        });
        self.insert(position.clone(), vec![node])
    }

    pub fn remove(&mut self, range: &Range) -> Result<&mut Self, ModelError> {
        let deltas = Delta::remove(self.document.model(), range, self.document.version())?;
        self.document.apply_deltas(deltas)?;

        Ok(self)
    }

    pub fn move_range(&mut self, range: &Range, target: Position) -> Result<&mut Self, ModelError> {
        let delta = Delta::move_range(range, target, self.document.version())?;
        self.apply(delta)
    }

    pub fn set_attribute(&mut self, range: &Range, key: &str, value: Value) -> Result<&mut Self, ModelError> {
        self.change_attribute(range, key, Some(value))
    }

    pub fn remove_attribute(&mut self, range: &Range, key: &str) -> Result<&mut Self, ModelError> {
        self.change_attribute(range, key, None)
    }

    fn change_attribute(&mut self, range: &Range, key: &str, value: Option<Value>) -> Result<&mut Self, ModelError> {
        match Delta::attribute(self.document.model(), range, key, value, self.document.version())? {
            Some(delta) => self.apply(delta),
            None => Ok(self),
        }
    }

    pub fn set_root_attribute(&mut self, root: &str, key: &str, value: Value) -> Result<&mut Self, ModelError> {
        self.change_root_attribute(root, key, Some(value))
    }

    pub fn remove_root_attribute(&mut self, root: &str, key: &str) -> Result<&mut Self, ModelError> {
        self.change_root_attribute(root, key, None)
    }

    fn change_root_attribute(
        &mut self,
        root: &str,
        key: &str,
        value: Option<Value>,
    ) -> Result<&mut Self, ModelError> {
        match Delta::root_attribute(self.document.model(), root, key, value, self.document.version())? {
            Some(delta) => self.apply(delta),
            None => Ok(self),
        }
    }

    /// Renames the element right after `position`.
    pub fn rename(&mut self, position: &Position, new_name: &str) -> Result<&mut Self, ModelError> {
        let delta = Delta::rename(self.document.model(), position, new_name, self.document.version())?;
        self.apply(delta)
    }

    pub fn split(&mut self, position: &Position) -> Result<&mut Self, ModelError> {
        let delta = Delta::split(self.document.model(), position, self.document.version())?;
        self.apply(delta)
    }

    /// Merges the element after `position` into the element before it.
    pub fn merge(&mut self, position: &Position) -> Result<&mut Self, ModelError> {
        let delta = Delta::merge(self.document.model(), position, self.document.version())?;
        self.apply(delta)
    }

    pub fn wrap(&mut self, range: &Range, wrapper: Element) -> Result<&mut Self, ModelError> {
        let delta = Delta::wrap(range, wrapper, self.document.version())?;
        self.apply(delta)
    }

    /// Replaces the element after `position` with its children.
    pub fn unwrap(&mut self, position: &Position) -> Result<&mut Self, ModelError> {
        let delta = Delta::unwrap(self.document.model(), position, self.document.version())?;
        self.apply(delta)
    }
}
