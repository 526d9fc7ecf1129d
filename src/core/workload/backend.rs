use super::cpu::CpuBackend;
use crate::common::BurnerError;
use std::sync::Arc;
use tracing::{info, warn};

/// Something that can burn cycles on behalf of one device.
pub trait ComputeBackend: Send {
    fn name(&self) -> &'static str;

    /// Run `batch_size` multiplications of `matrix_size`-square matrices and wait for them.
    fn issue_batch(&mut self, matrix_size: usize, batch_size: usize) -> anyhow::Result<()>;
}

/// Builds a backend for `(device_id, matrix_size)`, allocating its buffers up front.
pub type BackendFactory =
    Arc<dyn Fn(u32, usize) -> Result<Box<dyn ComputeBackend>, BurnerError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Accelerated,
    CpuFallback,
}

impl BackendKind {
    /// Probe for the GPU backend once. A missing backend is logged and never fatal.
    pub fn detect() -> Self {
        match probe_accelerated() {
            Ok(()) => {
                info!(target: "gpu_burner::workload", "Compute backend: CUDA (cuBLAS)");
                Self::Accelerated
            }
            Err(reason) => {
                let err = BurnerError::BackendDegraded(reason);
                warn!(target: "gpu_burner::workload", "{err}; using CPU matrix backend, GPU load will not rise");
                Self::CpuFallback
            }
        }
    }

    pub fn create(
        self,
        device_id: u32,
        matrix_size: usize,
    ) -> Result<Box<dyn ComputeBackend>, BurnerError> {
        match self {
            Self::Accelerated => create_accelerated(device_id, matrix_size),
            Self::CpuFallback => Ok(Box::new(CpuBackend::new(matrix_size))),
        }
    }

    pub fn factory(self) -> BackendFactory {
        Arc::new(move |device_id, matrix_size| self.create(device_id, matrix_size))
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accelerated => write!(f, "cuda"),
            Self::CpuFallback => write!(f, "cpu"),
        }
    }
}

#[cfg(feature = "cuda")]
fn probe_accelerated() -> Result<(), String> {
    super::cuda::probe().map_err(|e| format!("{e:#}"))
}

#[cfg(not(feature = "cuda"))]
fn probe_accelerated() -> Result<(), String> {
    Err("built without the `cuda` feature".to_string())
}

#[cfg(feature = "cuda")]
fn create_accelerated(
    device_id: u32,
    matrix_size: usize,
) -> Result<Box<dyn ComputeBackend>, BurnerError> {
    super::cuda::CudaBackend::new(device_id, matrix_size)
        .map(|b| Box::new(b) as Box<dyn ComputeBackend>)
        .map_err(|e| BurnerError::unavailable(device_id, format!("{e:#}")))
}

#[cfg(not(feature = "cuda"))]
fn create_accelerated(
    device_id: u32,
    _matrix_size: usize,
) -> Result<Box<dyn ComputeBackend>, BurnerError> {
    Err(BurnerError::unavailable(device_id, "CUDA backend not compiled in"))
}
