mod backend;
mod cpu;
#[cfg(feature = "cuda")]
mod cuda;
mod driver;

pub use backend::{BackendFactory, BackendKind, ComputeBackend};
pub use cpu::CpuBackend;
pub use driver::{WorkloadDriver, WorkloadHandle, idle_pause, scaled_batch};
