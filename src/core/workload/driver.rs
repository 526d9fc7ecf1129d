use super::{BackendFactory, BackendKind, ComputeBackend};
use crate::common::{BurnerError, MAX_BURN_PAUSE_MS};
use crate::core::config::WorkloadConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A running burn task bound to one device. Dropping the handle stops the task.
pub struct WorkloadHandle {
    device_id: u32,
    backend: &'static str,
    intensity: Arc<AtomicU64>,
    batches: Arc<AtomicU64>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl WorkloadHandle {
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn intensity(&self) -> f64 {
        f64::from_bits(self.intensity.load(Ordering::Relaxed))
    }

    pub fn batches_issued(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// The worker thread is still issuing work.
    pub fn is_live(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    pub fn is_stopped(&self) -> bool {
        self.worker.is_none()
    }

    fn release(&mut self) {
        // Dropping the sender wakes the worker out of its pause.
        self.stop_tx.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!(target: "gpu_burner::workload", "GPU {} burn worker panicked", self.device_id);
        }
    }
}

impl Drop for WorkloadHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for WorkloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadHandle")
            .field("device_id", &self.device_id)
            .field("backend", &self.backend)
            .field("intensity", &self.intensity())
            .field("batches", &self.batches_issued())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Starts, rescales and stops burn tasks. Holds no per-device state of its own.
#[derive(Clone)]
pub struct WorkloadDriver {
    factory: BackendFactory,
    matrix_size: usize,
    batch_size: usize,
}

impl WorkloadDriver {
    pub fn new(kind: BackendKind, cfg: &WorkloadConfig) -> Self {
        Self::with_factory(kind.factory(), cfg)
    }

    pub fn with_factory(factory: BackendFactory, cfg: &WorkloadConfig) -> Self {
        Self {
            factory,
            matrix_size: cfg.matrix_size,
            batch_size: cfg.batch_size,
        }
    }

    pub fn start(&self, device_id: u32, intensity: f64) -> Result<WorkloadHandle, BurnerError> {
        let intensity = clamp_intensity(device_id, intensity);
        let backend = (self.factory)(device_id, self.matrix_size)?;
        let backend_name = backend.name();

        let level = Arc::new(AtomicU64::new(intensity.to_bits()));
        let batches = Arc::new(AtomicU64::new(0));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let job = BurnJob {
            device_id,
            backend,
            matrix_size: self.matrix_size,
            batch_size: self.batch_size,
            intensity: level.clone(),
            batches: batches.clone(),
            stop_rx,
        };
        let worker = std::thread::Builder::new()
            .name(format!("burn-gpu{device_id}"))
            .spawn(move || job.run())
            .map_err(|e| BurnerError::unavailable(device_id, format!("cannot spawn worker: {e}")))?;

        info!(
            target: "gpu_burner::workload",
            "GPU {} workload started (backend: {}, intensity: {:.2}, matrix: {}, batch: {})",
            device_id, backend_name, intensity, self.matrix_size, self.batch_size
        );

        Ok(WorkloadHandle {
            device_id,
            backend: backend_name,
            intensity: level,
            batches,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Rescale a running task in place; the worker picks the new level up on its next batch.
    pub fn adjust(&self, handle: &WorkloadHandle, intensity: f64) -> Result<(), BurnerError> {
        if !handle.is_live() {
            return Err(BurnerError::unavailable(
                handle.device_id,
                "workload is not running",
            ));
        }
        let intensity = clamp_intensity(handle.device_id, intensity);
        let previous = handle.intensity();
        handle.intensity.store(intensity.to_bits(), Ordering::Relaxed);
        info!(
            target: "gpu_burner::workload",
            "GPU {} workload intensity {:.2} → {:.2}", handle.device_id, previous, intensity
        );
        Ok(())
    }

    /// Halt the task and free its buffers. Stopping a stopped handle does nothing.
    pub fn stop(&self, handle: &mut WorkloadHandle) {
        if handle.is_stopped() {
            debug!(target: "gpu_burner::workload", "GPU {} workload already stopped", handle.device_id);
            return;
        }
        handle.release();
        info!(
            target: "gpu_burner::workload",
            "GPU {} workload stopped after {} batches", handle.device_id, handle.batches_issued()
        );
    }
}

/// Multiplications per batch at `intensity`; never less than one.
pub fn scaled_batch(batch_size: usize, intensity: f64) -> usize {
    ((batch_size as f64 * intensity) as usize).max(1)
}

/// Pause after each batch: full intensity never rests, zero rests the longest.
pub fn idle_pause(intensity: f64) -> Duration {
    Duration::from_secs_f64((1.0 - intensity.clamp(0.0, 1.0)) * MAX_BURN_PAUSE_MS as f64 / 1000.0)
}

fn clamp_intensity(device_id: u32, intensity: f64) -> f64 {
    if (0.0..=1.0).contains(&intensity) {
        return intensity;
    }
    let clamped = if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0)
    };
    warn!(
        target: "gpu_burner::workload",
        "GPU {} intensity {} outside [0, 1], using {:.2}", device_id, intensity, clamped
    );
    clamped
}

struct BurnJob {
    device_id: u32,
    backend: Box<dyn ComputeBackend>,
    matrix_size: usize,
    batch_size: usize,
    intensity: Arc<AtomicU64>,
    batches: Arc<AtomicU64>,
    stop_rx: Receiver<()>,
}

impl BurnJob {
    fn run(mut self) {
        loop {
            if !matches!(self.stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                break;
            }

            let intensity = f64::from_bits(self.intensity.load(Ordering::Relaxed));
            let count = scaled_batch(self.batch_size, intensity);
            if let Err(e) = self.backend.issue_batch(self.matrix_size, count) {
                error!(
                    target: "gpu_burner::workload",
                    "GPU {} {} backend failed, worker exiting: {:#}",
                    self.device_id, self.backend.name(), e
                );
                break;
            }
            self.batches.fetch_add(1, Ordering::Relaxed);

            let pause = idle_pause(intensity);
            if !pause.is_zero() {
                match self.stop_rx.recv_timeout(pause) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
            }
        }
        debug!(target: "gpu_burner::workload", "GPU {} burn worker exited", self.device_id);
    }
}
