use crate::core::config::Settings;
use crate::core::monitor::{self, DeviceSampler};
use crate::core::workload::{BackendKind, WorkloadDriver};
use crate::daemon::controller::{ControlPolicy, Controller};
use anyhow::{Context, Result, bail};
use std::future::Future;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

pub struct Daemon {
    pub(crate) cfg: Settings,
    pub(crate) policy: ControlPolicy,
    pub(crate) interval: Duration,
    pub(crate) sampler: Box<dyn DeviceSampler>,
    pub(crate) driver: WorkloadDriver,
    pub(crate) controllers: Vec<Controller>,
    pub(crate) tick_count: u64,
}

impl Daemon {
    /// One controller per configured target, no hardware checks.
    pub fn new(cfg: Settings, sampler: Box<dyn DeviceSampler>, driver: WorkloadDriver) -> Self {
        let targets = cfg.target_gpus.clone();
        Self::with_targets(cfg, sampler, driver, &targets)
    }

    /// Drop targets the sampler cannot see, log what remains, and fail if nothing does.
    pub fn bootstrap(
        cfg: Settings,
        sampler: Box<dyn DeviceSampler>,
        driver: WorkloadDriver,
    ) -> Result<Self> {
        let count = sampler.device_count().context("Failed to enumerate GPUs")?;

        let targets: Vec<u32> = cfg
            .target_gpus
            .iter()
            .copied()
            .filter(|&id| {
                let present = id < count;
                if !present {
                    warn!(target: "gpu_burner::daemon", "GPU {} not present ({} visible), skipping", id, count);
                }
                present
            })
            .collect();

        if targets.is_empty() {
            bail!("None of the target GPUs {:?} are available", cfg.target_gpus);
        }

        info!(target: "gpu_burner::daemon", "=== GPU devices ===");
        for &id in &targets {
            match sampler.describe(id) {
                Ok(dev) => info!(
                    target: "gpu_burner::daemon",
                    "GPU {}: {} | memory {:.0} MB | utilization {:.0}% | {:.0}°C",
                    id, dev.name, dev.reading.memory_total_mb, dev.reading.utilization_pct, dev.reading.temperature_c
                ),
                Err(e) => warn!(target: "gpu_burner::daemon", "GPU {}: {}", id, e),
            }
        }
        info!(target: "gpu_burner::daemon", "===================");

        Ok(Self::with_targets(cfg, sampler, driver, &targets))
    }

    fn with_targets(
        cfg: Settings,
        sampler: Box<dyn DeviceSampler>,
        driver: WorkloadDriver,
        targets: &[u32],
    ) -> Self {
        Self {
            policy: ControlPolicy::from_settings(&cfg),
            interval: cfg.check_interval(),
            controllers: targets.iter().map(|&id| Controller::new(id)).collect(),
            cfg,
            sampler,
            driver,
            tick_count: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.cfg
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn active_workloads(&self) -> usize {
        self.controllers
            .iter()
            .filter(|c| c.handle().is_some_and(|h| !h.is_stopped()))
            .count()
    }

    /// Cycle until `shutdown` resolves, then stop every workload before returning.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        info!(
            target: "gpu_burner::daemon",
            "Control loop started: {} GPU(s), threshold {}%, every {:?}",
            self.controllers.len(), self.policy.threshold, self.interval
        );

        let mut shutdown = std::pin::pin!(shutdown);

        // First poll installs the signal handlers before any load can start.
        let early = tokio::select! {
            biased;
            _ = &mut shutdown => true,
            _ = std::future::ready(()) => false,
        };

        if early {
            info!(target: "gpu_burner::daemon", "Shutdown requested before first cycle");
        } else {
            self.tick();
            self.cycle_until(shutdown).await;
        }

        self.shutdown();
    }

    async fn cycle_until<F: Future<Output = ()>>(&mut self, mut shutdown: std::pin::Pin<&mut F>) {
        loop {
            tokio::select! {
                _ = time::sleep(self.interval) => {
                    self.tick();
                }
                _ = &mut shutdown => {
                    info!(target: "gpu_burner::daemon", "Shutdown requested");
                    break;
                }
            }
        }
    }

    /// Stop every running workload. Called on the way out; safe to call again.
    pub fn shutdown(&mut self) {
        for controller in &mut self.controllers {
            controller.shutdown(&self.driver);
        }
        info!(target: "gpu_burner::daemon", "All workloads stopped");
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            error!(target: "gpu_burner::daemon", "Failed to listen for ctrl-c: {e}");
                            std::future::pending::<()>().await;
                        }
                    }
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(target: "gpu_burner::daemon", "SIGTERM handler unavailable: {e}");
                wait_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_ctrl_c().await;
}

async fn wait_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(target: "gpu_burner::daemon", "Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

pub async fn run_with_config(cfg: Settings) -> Result<()> {
    let sampler = monitor::create_sampler().context("Failed to initialize GPU monitoring")?;
    let backend = BackendKind::detect();
    let driver = WorkloadDriver::new(backend, &cfg.workload);

    let mut daemon = Daemon::bootstrap(cfg, sampler, driver)?;
    daemon.run_until(shutdown_signal()).await;

    info!(target: "gpu_burner::daemon", "Daemon | Stopped");
    Ok(())
}
