mod node;
mod position;
pub(crate) mod range;
mod tree;
mod tree_walker;

pub use node::{Attributes, Element, Node, Text};
pub use position::{Position, PositionRelation};
pub use range::Range;
pub use tree::{GRAVEYARD_ROOT_NAME, Model};
pub use tree_walker::{Item, RangeItems, TextProxy, WalkerValue};
