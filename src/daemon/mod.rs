pub mod controller;
pub mod diag;
pub mod run;
pub mod state;
mod tick;

pub use controller::{ControlAction, ControlPolicy, Controller};
pub use run::{Daemon, run_with_config, shutdown_signal};
pub use state::{CycleSummary, DeviceState, DeviceStatus};
