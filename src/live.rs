mod live_range;
mod live_selection;
mod selection;

pub use live_range::LiveRange;
pub use live_selection::{AttributePriority, LiveSelection};
pub use selection::Selection;
