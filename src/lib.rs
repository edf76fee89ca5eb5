mod config;
mod delta;
mod document;
mod errors;
mod live;
mod model;
mod operation;
mod utils;

pub use config::DocumentConfig;
pub use delta::{Delta, DeltaKind, transform_delta, transform_deltas};
pub use document::{Batch, Change, Document, History, Subscription};
pub use errors::ModelError;
pub use live::{AttributePriority, LiveRange, LiveSelection, Selection};
pub use model::{
    Attributes, Element, GRAVEYARD_ROOT_NAME, Item, Model, Node, Position, PositionRelation, Range, RangeItems,
    Text, TextProxy, WalkerValue,
};
pub use operation::{
    AttributeOperation, InsertOperation, MoveSpan, Operation, OperationKind, RenameOperation,
    RootAttributeOperation, transform, transform_operations,
};
pub use utils::direction::Direction;
