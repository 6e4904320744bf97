//! The Controller process: bootstrap, steady-state receive loop, and
//! timeout-driven liveness detection.

mod driver;
mod state;

pub use driver::Controller;
pub use state::{ControllerState, SwitchState};
