use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{GRAVEYARD_ROOT_NAME, Node, Position, Range};

/// A single, versioned change of the document. `base_version` is the document
/// version the operation expects to be applied at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "baseVersion")]
    pub base_version: u64,

    #[serde(flatten)]
    pub kind: OperationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__className")]
pub enum OperationKind {
    #[serde(rename = "InsertOperation")]
    Insert(InsertOperation),
    #[serde(rename = "MoveOperation")]
    Move(MoveSpan),
    /// A move into the graveyard.
    #[serde(rename = "RemoveOperation")]
    Remove(MoveSpan),
    /// A move out of the graveyard.
    #[serde(rename = "ReinsertOperation")]
    Reinsert(MoveSpan),
    #[serde(rename = "AttributeOperation")]
    Attribute(AttributeOperation),
    #[serde(rename = "RootAttributeOperation")]
    RootAttribute(RootAttributeOperation),
    #[serde(rename = "RenameOperation")]
    Rename(RenameOperation),
    #[serde(rename = "NoOperation")]
    NoOperation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOperation {
    pub position: Position,
    pub nodes: Vec<Node>,
}

/// Payload shared by moves, removes and reinserts. `target_position` is
/// expressed in the tree as it was before the move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSpan {
    pub source_position: Position,
    pub how_many: usize,
    pub target_position: Position,
}

/// Changes `key` on every node of a flat range. `None` stands for a missing
/// attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeOperation {
    pub range: Range,
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootAttributeOperation {
    pub root: String,
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOperation {
    /// Position right before the renamed element.
    pub position: Position,
    pub old_name: String,
    pub new_name: String,
}

impl InsertOperation {
    pub fn new(position: Position, nodes: Vec<Node>) -> Self { Self { position, nodes } }

    /// Number of offset slots the inserted nodes take up.
    pub fn offset_size(&self) -> usize { self.nodes.iter().map(Node::offset_size).sum() }
}

impl MoveSpan {
    pub fn new(source_position: Position, how_many: usize, target_position: Position) -> Self {
        Self {
            source_position,
            how_many,
            target_position,
        }
    }

    /// Span moving nodes to the start of the graveyard, where removed content
    /// goes.
    pub fn removal(source_position: Position, how_many: usize) -> Self {
        Self::new(
            source_position,
            how_many,
            Position::new(GRAVEYARD_ROOT_NAME, vec![0]),
        )
    }

    /// The moved nodes before the move.
    pub fn source_range(&self) -> Range {
        Range::new(
            self.source_position.clone(),
            self.source_position
                .with_offset(self.source_position.offset() + self.how_many),
        )
    }

    /// Where the moved nodes start after the move.
    pub fn moved_range_start(&self) -> Position {
        self.target_position
            .get_transformed_by_deletion(&self.source_position, self.how_many)
            .unwrap_or_else(|| self.target_position.clone())
    }

    /// Whether the target lies inside the moved nodes, either strictly between
    /// them or deeper inside one of them.
    pub fn targets_into_itself(&self) -> bool {
        let source = &self.source_position;
        let target = &self.target_position;
        if source.root() != target.root() || self.how_many == 0 {
            return false;
        }

        let depth = source.depth();
        if target.depth() < depth || target.path()[..depth - 1] != *source.parent_path() {
            return false;
        }

        let slot = target.path()[depth - 1];
        if target.depth() == depth {
            slot > source.offset() && slot < source.offset() + self.how_many
        } else {
            slot >= source.offset() && slot < source.offset() + self.how_many
        }
    }

    /// The reversed span: moves the nodes back from where they landed.
    pub(crate) fn reversed(&self) -> MoveSpan {
        let moved_start = self.moved_range_start();
        let back = self
            .source_position
            .get_transformed_by_insertion(&moved_start, self.how_many, false);

        MoveSpan::new(moved_start, self.how_many, back)
    }
}

impl Operation {
    pub fn new(base_version: u64, kind: OperationKind) -> Self { Self { base_version, kind } }

    pub fn no_operation(base_version: u64) -> Self { Self::new(base_version, OperationKind::NoOperation) }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            OperationKind::Insert(_) => "insert",
            OperationKind::Move(_) => "move",
            OperationKind::Remove(_) => "remove",
            OperationKind::Reinsert(_) => "reinsert",
            OperationKind::Attribute(_) => "attribute",
            OperationKind::RootAttribute(_) => "rootAttribute",
            OperationKind::Rename(_) => "rename",
            OperationKind::NoOperation => "noop",
        }
    }

    pub fn is_no_operation(&self) -> bool { matches!(self.kind, OperationKind::NoOperation) }

    /// The move payload of moves, removes and reinserts.
    pub fn move_span(&self) -> Option<&MoveSpan> {
        match &self.kind {
            OperationKind::Move(span) | OperationKind::Remove(span) | OperationKind::Reinsert(span) => {
                Some(span)
            }
            _ => None,
        }
    }

    /// Whether the operation touches content outside the graveyard.
    pub fn is_document_operation(&self) -> bool {
        let outside = |position: &Position| position.root() != GRAVEYARD_ROOT_NAME;

        match &self.kind {
            OperationKind::Insert(insert) => outside(&insert.position),
            OperationKind::Move(span) | OperationKind::Remove(span) | OperationKind::Reinsert(span) => {
                outside(&span.source_position) || outside(&span.target_position)
            }
            OperationKind::Attribute(attribute) => outside(attribute.range.start()),
            OperationKind::RootAttribute(root_attribute) => root_attribute.root != GRAVEYARD_ROOT_NAME,
            OperationKind::Rename(rename) => outside(&rename.position),
            OperationKind::NoOperation => false,
        }
    }

    /// Roots referenced by the operation.
    pub fn roots(&self) -> Vec<&str> {
        match &self.kind {
            OperationKind::Insert(insert) => vec![insert.position.root()],
            OperationKind::Move(span) | OperationKind::Remove(span) | OperationKind::Reinsert(span) => {
                vec![span.source_position.root(), span.target_position.root()]
            }
            OperationKind::Attribute(attribute) => vec![attribute.range.root()],
            OperationKind::RootAttribute(root_attribute) => vec![root_attribute.root.as_str()],
            OperationKind::Rename(rename) => vec![rename.position.root()],
            OperationKind::NoOperation => Vec::new(),
        }
    }

    /// The operation undoing this one, to be applied right after it.
    #[must_use]
    pub fn reversed(&self) -> Operation {
        let kind = match &self.kind {
            OperationKind::Insert(insert) => {
                OperationKind::Remove(MoveSpan::removal(insert.position.clone(), insert.offset_size()))
            }
            OperationKind::Move(span) => OperationKind::Move(span.reversed()),
            OperationKind::Remove(span) => OperationKind::Reinsert(span.reversed()),
            OperationKind::Reinsert(span) => OperationKind::Remove(span.reversed()),
            OperationKind::Attribute(attribute) => OperationKind::Attribute(AttributeOperation {
                range: attribute.range.clone(),
                key: attribute.key.clone(),
                old_value: attribute.new_value.clone(),
                new_value: attribute.old_value.clone(),
            }),
            OperationKind::RootAttribute(root_attribute) => {
                OperationKind::RootAttribute(RootAttributeOperation {
                    root: root_attribute.root.clone(),
                    key: root_attribute.key.clone(),
                    old_value: root_attribute.new_value.clone(),
                    new_value: root_attribute.old_value.clone(),
                })
            }
            OperationKind::Rename(rename) => OperationKind::Rename(RenameOperation {
                position: rename.position.clone(),
                old_name: rename.new_name.clone(),
                new_name: rename.old_name.clone(),
            }),
            OperationKind::NoOperation => OperationKind::NoOperation,
        };

        Operation::new(self.base_version + 1, kind)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    fn pos(path: &[usize]) -> Position { Position::new("main", path.to_vec()) }

    #[test_case(&[0, 2], 3, &[0, 1], false ; "target before the span")]
    #[test_case(&[0, 2], 3, &[0, 2], false ; "target at the span start")]
    #[test_case(&[0, 2], 3, &[0, 4], true ; "target between moved nodes")]
    #[test_case(&[0, 2], 3, &[0, 5], false ; "target right after the span")]
    #[test_case(&[1], 2, &[2, 0], true ; "target inside a moved element")]
    #[test_case(&[1], 2, &[3, 0], false ; "target inside a following element")]
    fn test_targets_into_itself(source: &[usize], how_many: usize, target: &[usize], expected: bool) {
        assert_eq!(MoveSpan::new(pos(source), how_many, pos(target)).targets_into_itself(), expected);
    }

    #[test]
    fn test_reversed_move_brings_nodes_back() {
        let span = MoveSpan::new(pos(&[0, 1]), 2, pos(&[0, 5]));

        let reversed = span.reversed();

        assert_eq!(reversed, MoveSpan::new(pos(&[0, 3]), 2, pos(&[0, 1])));
    }

    #[test]
    fn test_reversed_insert_is_remove() {
        let insert = Operation::new(
            3,
            OperationKind::Insert(InsertOperation::new(pos(&[0, 1]), vec![Node::from("abc")])),
        );

        let reversed = insert.reversed();

        assert_eq!(reversed.base_version, 4);
        assert_eq!(reversed.kind, OperationKind::Remove(MoveSpan::removal(pos(&[0, 1]), 3)));
        assert_eq!(reversed.reversed().type_name(), "reinsert");
    }

    #[test]
    fn test_graveyard_only_operation_is_not_a_document_operation() {
        let buried = Operation::new(
            0,
            OperationKind::Insert(InsertOperation::new(
                Position::new(GRAVEYARD_ROOT_NAME, vec![0]),
                vec![Node::from("x")],
            )),
        );

        assert!(!buried.is_document_operation());
        assert!(Operation::new(0, OperationKind::Remove(MoveSpan::removal(pos(&[0]), 1))).is_document_operation());
    }
}
