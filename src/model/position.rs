use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    errors::ModelError,
    model::Model,
    utils::compare_paths::{PathRelation, compare_paths},
};

/// Where one position lies compared to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionRelation {
    Before,
    After,
    Same,
    /// The positions are in different roots and cannot be compared.
    Different,
}

/// A point in the document tree: the name of a root and the offsets to
/// descend through, the last one being the offset inside the parent.
///
/// Positions don't hold on to nodes. After the tree changes, a position has to
/// be transformed by the applied change, otherwise it may point somewhere
/// else than intended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    root: String,
    path: Vec<usize>,
}

#[derive(Deserialize)]
struct RawPosition {
    root: String,
    path: Vec<usize>,
}

impl TryFrom<RawPosition> for Position {
    type Error = ModelError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> { Position::try_new(raw.root, raw.path) }
}

impl Position {
    /// # Panics
    ///
    /// Panics if `path` is empty. Use `try_new` for untrusted input.
    pub fn new(root: impl Into<String>, path: Vec<usize>) -> Self {
        assert!(!path.is_empty(), "Position path must not be empty");

        Self {
            root: root.into(),
            path,
        }
    }

    pub fn try_new(root: impl Into<String>, path: Vec<usize>) -> Result<Self, ModelError> {
        if path.is_empty() {
            return Err(ModelError::InvalidArgument(
                "position path must not be empty".to_owned(),
            ));
        }

        Ok(Self::new(root, path))
    }

    /// Position at `offset` inside the element found at `parent_path`.
    pub fn from_parent_and_offset(
        root: impl Into<String>,
        parent_path: &[usize],
        offset: usize,
    ) -> Self {
        let mut path = parent_path.to_vec();
        path.push(offset);

        Self::new(root, path)
    }

    pub fn root(&self) -> &str { &self.root }

    pub fn path(&self) -> &[usize] { &self.path }

    /// Offset inside the parent element.
    pub fn offset(&self) -> usize { self.path[self.path.len() - 1] }

    pub fn parent_path(&self) -> &[usize] { &self.path[..self.path.len() - 1] }

    pub fn depth(&self) -> usize { self.path.len() }

    #[must_use]
    pub fn with_offset(&self, offset: usize) -> Self {
        let mut path = self.path.clone();
        let last = path.len() - 1;
        path[last] = offset;

        Self::new(self.root.clone(), path)
    }

    /// Position `shift` slots further in the same parent.
    pub fn get_shifted_by(&self, shift: isize) -> Result<Self, ModelError> {
        let offset = self.offset().checked_add_signed(shift).ok_or_else(|| {
            ModelError::InvalidArgument(format!("cannot shift {self} by {shift}"))
        })?;

        Ok(self.with_offset(offset))
    }

    /// Position of the parent element, i.e. the position right before it.
    /// Returns `None` for positions directly inside a root.
    pub fn parent_position(&self) -> Option<Self> {
        (self.path.len() > 1).then(|| Self::new(self.root.clone(), self.parent_path().to_vec()))
    }

    /// Position inside the node right after this position.
    #[must_use]
    pub fn child(&self, offset: usize) -> Self {
        let mut path = self.path.clone();
        path.push(offset);

        Self::new(self.root.clone(), path)
    }

    pub fn compare(&self, other: &Position) -> PositionRelation {
        if self.root != other.root {
            return PositionRelation::Different;
        }

        match compare_paths(&self.path, &other.path) {
            PathRelation::Same => PositionRelation::Same,
            PathRelation::Prefix => PositionRelation::Before,
            PathRelation::Extension => PositionRelation::After,
            PathRelation::Differ(index) => {
                if self.path[index] < other.path[index] {
                    PositionRelation::Before
                } else {
                    PositionRelation::After
                }
            }
        }
    }

    pub fn is_before(&self, other: &Position) -> bool {
        self.compare(other) == PositionRelation::Before
    }

    pub fn is_after(&self, other: &Position) -> bool {
        self.compare(other) == PositionRelation::After
    }

    pub fn is_equal(&self, other: &Position) -> bool { self == other }

    pub fn has_same_parent_as(&self, other: &Position) -> bool {
        self.root == other.root && self.parent_path() == other.parent_path()
    }

    /// Longest common prefix of both paths. Empty for different roots.
    pub fn get_common_path(&self, other: &Position) -> Vec<usize> {
        if self.root != other.root {
            return Vec::new();
        }

        self.path
            .iter()
            .zip(other.path.iter())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect()
    }

    /// Whether no node lies between the two positions, e.g. the end of a
    /// paragraph and the position right after that paragraph.
    pub fn is_touching(&self, other: &Position, model: &Model) -> bool {
        let (mut left, mut right) = match self.compare(other) {
            PositionRelation::Same => return true,
            PositionRelation::Before => (self.path.clone(), other.path.clone()),
            PositionRelation::After => (other.path.clone(), self.path.clone()),
            PositionRelation::Different => return false,
        };

        while !left.is_empty() && !right.is_empty() {
            if left == right {
                return true;
            }

            if left.len() > right.len() {
                let parent_path = &left[..left.len() - 1];
                let Ok(max_offset) = model.max_offset(&self.root, parent_path) else {
                    return false;
                };

                if left[left.len() - 1] != max_offset {
                    return false;
                }

                left.pop();
                if let Some(last) = left.last_mut() {
                    *last += 1;
                }
            } else {
                if right[right.len() - 1] != 0 {
                    return false;
                }

                right.pop();
            }
        }

        false
    }

    /// Where this position ends up after `how_many` slots get inserted at
    /// `insert_position`. With `insert_before`, a position equal to the
    /// insertion point is pushed behind the inserted content.
    #[must_use]
    pub fn get_transformed_by_insertion(
        &self,
        insert_position: &Position,
        how_many: usize,
        insert_before: bool,
    ) -> Position {
        let mut transformed = self.clone();
        if self.root != insert_position.root {
            return transformed;
        }

        match compare_paths(insert_position.parent_path(), self.parent_path()) {
            PathRelation::Same => {
                if insert_position.offset() < self.offset()
                    || (insert_position.offset() == self.offset() && insert_before)
                {
                    let last = transformed.path.len() - 1;
                    transformed.path[last] += how_many;
                }
            }
            PathRelation::Prefix => {
                let index = insert_position.path.len() - 1;
                if insert_position.offset() <= self.path[index] {
                    transformed.path[index] += how_many;
                }
            }
            PathRelation::Extension | PathRelation::Differ(_) => {}
        }

        transformed
    }

    /// Where this position ends up after `how_many` slots starting at
    /// `delete_position` are taken out of the tree. Returns `None` if the
    /// position was inside the removed content.
    pub fn get_transformed_by_deletion(
        &self,
        delete_position: &Position,
        how_many: usize,
    ) -> Option<Position> {
        let mut transformed = self.clone();
        if self.root != delete_position.root {
            return Some(transformed);
        }

        match compare_paths(delete_position.parent_path(), self.parent_path()) {
            PathRelation::Same => {
                if delete_position.offset() < self.offset() {
                    if delete_position.offset() + how_many > self.offset() {
                        return None;
                    }

                    let last = transformed.path.len() - 1;
                    transformed.path[last] -= how_many;
                }
            }
            PathRelation::Prefix => {
                let index = delete_position.path.len() - 1;
                if delete_position.offset() <= self.path[index] {
                    if delete_position.offset() + how_many > self.path[index] {
                        return None;
                    }

                    transformed.path[index] -= how_many;
                }
            }
            PathRelation::Extension | PathRelation::Differ(_) => {}
        }

        Some(transformed)
    }

    /// Where this position ends up after `how_many` slots get moved from
    /// `source` to `target`. `target` is expressed before the move. A position
    /// inside the moved content (or equal to `source` when `sticky`) travels
    /// with it.
    #[must_use]
    pub fn get_transformed_by_move(
        &self,
        source: &Position,
        target: &Position,
        how_many: usize,
        insert_before: bool,
        sticky: bool,
    ) -> Position {
        let target = target
            .get_transformed_by_deletion(source, how_many)
            .unwrap_or_else(|| target.clone());

        match self.get_transformed_by_deletion(source, how_many) {
            Some(transformed) if !(sticky && transformed == *source) => {
                transformed.get_transformed_by_insertion(&target, how_many, insert_before)
            }
            _ => self.get_combined(source, &target),
        }
    }

    /// Re-roots this position from below `source` to below `target`, keeping
    /// its relative offset. `self` has to be at or inside the content starting
    /// at `source`.
    #[must_use]
    pub fn get_combined(&self, source: &Position, target: &Position) -> Position {
        let index = source.path.len() - 1;
        let mut path = target.path.clone();
        let last = path.len() - 1;
        path[last] = (path[last] + self.path[index]).saturating_sub(source.offset());
        path.extend_from_slice(&self.path[index + 1..]);

        Position::new(target.root.clone(), path)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:?}", self.root, self.path)
    }
}
