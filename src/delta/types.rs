use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::operation::{Operation, OperationKind, renumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeltaKind {
    #[serde(rename = "InsertDelta")]
    Insert,
    #[serde(rename = "RemoveDelta")]
    Remove,
    #[serde(rename = "MoveDelta")]
    Move,
    #[serde(rename = "AttributeDelta")]
    Attribute,
    #[serde(rename = "RootAttributeDelta")]
    RootAttribute,
    #[serde(rename = "RenameDelta")]
    Rename,
    #[serde(rename = "SplitDelta")]
    Split,
    #[serde(rename = "MergeDelta")]
    Merge,
    #[serde(rename = "WrapDelta")]
    Wrap,
    #[serde(rename = "UnwrapDelta")]
    Unwrap,
    /// Holds a single `NoOperation`: what is left of a delta cancelled by a
    /// concurrent one.
    #[serde(rename = "NoDelta")]
    NoDelta,
}

impl DeltaKind {
    pub fn type_name(self) -> &'static str {
        match self {
            DeltaKind::Insert => "insert",
            DeltaKind::Remove => "remove",
            DeltaKind::Move => "move",
            DeltaKind::Attribute => "attribute",
            DeltaKind::RootAttribute => "rootAttribute",
            DeltaKind::Rename => "rename",
            DeltaKind::Split => "split",
            DeltaKind::Merge => "merge",
            DeltaKind::Wrap => "wrap",
            DeltaKind::Unwrap => "unwrap",
            DeltaKind::NoDelta => "noDelta",
        }
    }

    /// Kind of the delta undoing a delta of this kind.
    pub fn reversed(self) -> DeltaKind {
        match self {
            DeltaKind::Insert => DeltaKind::Remove,
            DeltaKind::Remove => DeltaKind::Insert,
            DeltaKind::Split => DeltaKind::Merge,
            DeltaKind::Merge => DeltaKind::Split,
            DeltaKind::Wrap => DeltaKind::Unwrap,
            DeltaKind::Unwrap => DeltaKind::Wrap,
            other => other,
        }
    }
}

impl Display for DeltaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.type_name()) }
}

/// One semantic edit: operations applied in sequence, each one at the version
/// following the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(rename = "__className")]
    kind: DeltaKind,
    operations: Vec<Operation>,
}

impl Delta {
    /// Operations are renumbered to follow each other starting from the first
    /// one's base version.
    pub fn new(kind: DeltaKind, operations: Vec<Operation>) -> Self {
        let mut delta = Self { kind, operations };
        if let Some(base_version) = delta.base_version() {
            delta.rebase(base_version);
        }

        delta
    }

    pub fn no_delta(base_version: u64) -> Self {
        Self::new(DeltaKind::NoDelta, vec![Operation::no_operation(base_version)])
    }

    /// Wraps a lone operation into the delta kind describing it.
    pub fn from_operation(operation: Operation) -> Self {
        let kind = match operation.kind {
            OperationKind::Insert(_) | OperationKind::Reinsert(_) => DeltaKind::Insert,
            OperationKind::Move(_) => DeltaKind::Move,
            OperationKind::Remove(_) => DeltaKind::Remove,
            OperationKind::Attribute(_) => DeltaKind::Attribute,
            OperationKind::RootAttribute(_) => DeltaKind::RootAttribute,
            OperationKind::Rename(_) => DeltaKind::Rename,
            OperationKind::NoOperation => DeltaKind::NoDelta,
        };

        Self::new(kind, vec![operation])
    }

    pub fn kind(&self) -> DeltaKind { self.kind }

    pub fn type_name(&self) -> &'static str { self.kind.type_name() }

    pub fn operations(&self) -> &[Operation] { &self.operations }

    pub fn into_operations(self) -> Vec<Operation> { self.operations }

    pub fn operation_count(&self) -> usize { self.operations.len() }

    /// Base version of the first operation, `None` for an empty delta.
    pub fn base_version(&self) -> Option<u64> { self.operations.first().map(|operation| operation.base_version) }

    /// Version of the document once the delta got applied.
    pub(crate) fn next_version(&self) -> Option<u64> {
        self.base_version()
            .map(|base_version| base_version + self.operations.len() as u64)
    }

    pub fn rebase(&mut self, base_version: u64) { renumber(&mut self.operations, base_version); }

    /// The delta undoing this one, to be applied right after it.
    #[must_use]
    pub fn reversed(&self) -> Delta {
        let mut operations = self
            .operations
            .iter()
            .rev()
            .map(Operation::reversed)
            .collect::<Vec<_>>();

        if let Some(next_version) = self.next_version() {
            renumber(&mut operations, next_version);
        }

        Delta {
            kind: self.kind.reversed(),
            operations,
        }
    }
}
