mod builders;
mod factory;
mod transform;
mod types;

pub use transform::{transform_delta, transform_deltas};
pub use types::{Delta, DeltaKind};
