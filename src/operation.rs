mod apply;
mod factory;
mod transform;
mod types;

pub use transform::{transform, transform_operations};
pub(crate) use transform::renumber;
pub use types::{
    AttributeOperation, InsertOperation, MoveSpan, Operation, OperationKind, RenameOperation,
    RootAttributeOperation,
};
