//! The Switch process: registration, keep-alive timer, and
//! neighbor-liveness tracking.

mod driver;
mod state;

pub use driver::Switch;
pub use state::{NeighborState, SwitchState};
