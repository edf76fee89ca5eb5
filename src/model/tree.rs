use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    errors::ModelError,
    model::{Element, Node, Position},
    utils::direction::Direction,
};

/// Name of the root holding removed content.
pub const GRAVEYARD_ROOT_NAME: &str = "$graveyard";

const GRAVEYARD_ROOT_ELEMENT: &str = "$graveyard";

/// The tree part of a document: named roots, one of them being the
/// graveyard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    roots: BTreeMap<String, Element>,
    default_root: String,
}

impl Model {
    pub fn new(default_root: impl Into<String>, root_element: impl Into<String>) -> Self {
        let default_root = default_root.into();
        let mut roots = BTreeMap::new();
        roots.insert(default_root.clone(), Element::new(root_element));
        roots.insert(
            GRAVEYARD_ROOT_NAME.to_owned(),
            Element::new(GRAVEYARD_ROOT_ELEMENT),
        );

        Self {
            roots,
            default_root,
        }
    }

    pub fn create_root(
        &mut self,
        name: impl Into<String>,
        element_name: impl Into<String>,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if self.roots.contains_key(&name) {
            return Err(ModelError::InvalidArgument(format!(
                "root '{name}' already exists"
            )));
        }

        self.roots.insert(name, Element::new(element_name));
        Ok(())
    }

    pub fn default_root_name(&self) -> &str { &self.default_root }

    pub fn graveyard(&self) -> &Element { &self.roots[GRAVEYARD_ROOT_NAME] }

    pub fn has_root(&self, name: &str) -> bool { self.roots.contains_key(name) }

    /// Names of all roots except the graveyard.
    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.roots
            .keys()
            .map(String::as_str)
            .filter(|name| *name != GRAVEYARD_ROOT_NAME)
    }

    pub fn root(&self, name: &str) -> Option<&Element> { self.roots.get(name) }

    pub fn root_mut(&mut self, name: &str) -> Option<&mut Element> { self.roots.get_mut(name) }

    /// Element reached by descending `path` from the root. An empty path
    /// denotes the root itself.
    pub fn element_at(&self, root: &str, path: &[usize]) -> Result<&Element, ModelError> {
        let mut element = self
            .roots
            .get(root)
            .ok_or_else(|| ModelError::RootNotFound(root.to_owned()))?;

        for (depth, offset) in path.iter().enumerate() {
            element = match element.child_at_offset(*offset) {
                Some((Node::Element(child), _)) => child,
                _ => {
                    return Err(ModelError::InvalidPosition(format!(
                        "{root}:{:?}",
                        &path[..=depth]
                    )));
                }
            };
        }

        Ok(element)
    }

    pub(crate) fn element_at_mut(
        &mut self,
        root: &str,
        path: &[usize],
    ) -> Result<&mut Element, ModelError> {
        let mut element = self
            .roots
            .get_mut(root)
            .ok_or_else(|| ModelError::RootNotFound(root.to_owned()))?;

        for (depth, offset) in path.iter().enumerate() {
            element = match element.child_at_offset_mut(*offset) {
                Some(Node::Element(child)) => child,
                _ => {
                    return Err(ModelError::InvalidPosition(format!(
                        "{root}:{:?}",
                        &path[..=depth]
                    )));
                }
            };
        }

        Ok(element)
    }

    pub fn parent_of(&self, position: &Position) -> Result<&Element, ModelError> {
        self.element_at(position.root(), position.parent_path())
    }

    pub fn max_offset(&self, root: &str, path: &[usize]) -> Result<usize, ModelError> {
        Ok(self.element_at(root, path)?.max_offset())
    }

    /// Whether the position resolves to an existing parent and an offset
    /// within it.
    pub fn is_valid_position(&self, position: &Position) -> bool {
        self.parent_of(position)
            .is_ok_and(|parent| position.offset() <= parent.max_offset())
    }

    /// The node occupying the slot right after the position.
    pub fn node_after(&self, position: &Position) -> Option<&Node> {
        self.parent_of(position)
            .ok()?
            .child_at_offset(position.offset())
            .map(|(node, _)| node)
    }

    /// The node occupying the slot right before the position.
    pub fn node_before(&self, position: &Position) -> Option<&Node> {
        let offset = position.offset().checked_sub(1)?;
        self.parent_of(position)
            .ok()?
            .child_at_offset(offset)
            .map(|(node, _)| node)
    }

    /// Element directly after the position, if the position is in front of
    /// one.
    pub fn element_after(&self, position: &Position) -> Option<&Element> {
        self.node_after(position).and_then(Node::as_element)
    }

    /// Next position of a pre-order walk: entering elements, stepping over
    /// characters, leaving elements at their end.
    pub fn step(&self, position: &Position, direction: Direction) -> Option<Position> {
        let parent = self.parent_of(position).ok()?;
        let offset = position.offset();

        match direction {
            Direction::Forward => {
                if offset < parent.max_offset() {
                    match parent.child_at_offset(offset)? {
                        (Node::Element(_), _) => Some(position.child(0)),
                        (Node::Text(_), _) => Some(position.with_offset(offset + 1)),
                    }
                } else {
                    position
                        .parent_position()
                        .map(|parent_position| parent_position.with_offset(parent_position.offset() + 1))
                }
            }
            Direction::Backward => {
                if offset > 0 {
                    match parent.child_at_offset(offset - 1)? {
                        (Node::Element(element), _) => Some(
                            position
                                .with_offset(offset - 1)
                                .child(element.max_offset()),
                        ),
                        (Node::Text(_), _) => Some(position.with_offset(offset - 1)),
                    }
                } else {
                    position.parent_position()
                }
            }
        }
    }

    /// A caret may rest in an element holding no elements (only text, or
    /// nothing at all) outside of the graveyard.
    pub fn is_valid_caret_position(&self, position: &Position) -> bool {
        position.root() != GRAVEYARD_ROOT_NAME
            && self.parent_of(position).is_ok_and(|parent| {
                position.offset() <= parent.max_offset() && !parent.has_element_children()
            })
    }

    /// The closest valid caret position, searching outward in both
    /// directions one step at a time.
    pub fn nearest_caret_position(&self, position: &Position) -> Option<Position> {
        if self.is_valid_caret_position(position) {
            return Some(position.clone());
        }

        let mut forward = Some(position.clone());
        let mut backward = Some(position.clone());

        while forward.is_some() || backward.is_some() {
            for (cursor, direction) in [
                (&mut forward, Direction::Forward),
                (&mut backward, Direction::Backward),
            ] {
                *cursor = cursor
                    .as_ref()
                    .and_then(|current| self.step(current, direction));

                if let Some(candidate) = cursor.as_ref() {
                    if self.is_valid_caret_position(candidate) {
                        return Some(candidate.clone());
                    }
                }
            }
        }

        None
    }

    /// First valid caret position of a root in document order.
    pub fn first_caret_position(&self, root: &str) -> Option<Position> {
        let mut position = Position::new(root, vec![0]);
        loop {
            if self.is_valid_caret_position(&position) {
                return Some(position);
            }

            position = self.step(&position, Direction::Forward)?;
        }
    }
}
