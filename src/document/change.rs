use std::{cell::Cell, rc::Rc};

use crate::{delta::DeltaKind, operation::Operation};

/// What listeners receive after an operation got applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub operation: Operation,
    /// Kind of the delta the operation is part of.
    pub delta_kind: DeltaKind,
    /// Document version after the operation.
    pub version: u64,
}

impl Change {
    /// Event name for the view layer: `insert`, `move`, `remove`, `reinsert`,
    /// `attribute`, `rootAttribute` or `rename`.
    pub fn kind(&self) -> &'static str { self.operation.type_name() }
}

/// Handle returned by `Document::subscribe`. Clones share the same state, so
/// every holder sees when the document drops the subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    active: Rc<Cell<bool>>,
}

impl Subscription {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            active: Rc::new(Cell::new(true)),
        }
    }

    /// `false` once unsubscribed or once the document got destroyed.
    pub fn is_active(&self) -> bool { self.active.get() }

    pub(crate) fn deactivate(&self) { self.active.set(false); }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for Subscription {}
