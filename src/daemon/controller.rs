use crate::common::INTENSITY_EPSILON;
use crate::core::config::Settings;
use crate::core::monitor::DeviceReading;
use crate::core::workload::{WorkloadDriver, WorkloadHandle};
use crate::daemon::state::{DeviceState, DeviceStatus};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPolicy {
    pub threshold: f64,
    pub base_intensity: f64,
    pub max_intensity: f64,
    pub step: f64,
}

impl ControlPolicy {
    pub fn from_settings(cfg: &Settings) -> Self {
        Self {
            threshold: cfg.utilization_threshold,
            base_intensity: cfg.workload.base_intensity,
            max_intensity: cfg.workload.max_intensity,
            step: cfg.workload.intensity_step,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// Idle → Active at the given intensity.
    Start(f64),
    Raise(f64),
    /// Active and already at the ceiling.
    Hold,
    Lower(f64),
    /// Active → Idle.
    Stop,
    /// Idle and the device is busy enough on its own.
    Idle,
}

/// Step policy without hysteresis: only the latest reading counts.
pub fn decide(state: &DeviceState, utilization: f64, policy: &ControlPolicy) -> ControlAction {
    let below = utilization < policy.threshold;

    match (state.running, below) {
        (false, true) => ControlAction::Start(policy.base_intensity),
        (false, false) => ControlAction::Idle,
        (true, true) => {
            if state.current_intensity >= policy.max_intensity - INTENSITY_EPSILON {
                ControlAction::Hold
            } else {
                ControlAction::Raise((state.current_intensity + policy.step).min(policy.max_intensity))
            }
        }
        (true, false) => {
            let next = state.current_intensity - policy.step;
            if next <= INTENSITY_EPSILON {
                ControlAction::Stop
            } else {
                ControlAction::Lower(next)
            }
        }
    }
}

/// Owns one device's state and, while Active, its workload handle.
#[derive(Debug)]
pub struct Controller {
    state: DeviceState,
    handle: Option<WorkloadHandle>,
}

impl Controller {
    pub fn new(device_id: u32) -> Self {
        Self {
            state: DeviceState::new(device_id),
            handle: None,
        }
    }

    pub fn device_id(&self) -> u32 {
        self.state.device_id
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn handle(&self) -> Option<&WorkloadHandle> {
        self.handle.as_ref()
    }

    /// `running` and a held handle always agree.
    pub fn is_consistent(&self) -> bool {
        self.state.running == self.handle.is_some()
    }

    pub fn step(
        &mut self,
        reading: DeviceReading,
        policy: &ControlPolicy,
        driver: &WorkloadDriver,
    ) -> ControlAction {
        self.reap_dead_worker();

        let id = self.state.device_id;
        let util = reading.utilization_pct;
        let action = decide(&self.state, util, policy);
        self.state.last_reading = Some(reading);

        match action {
            ControlAction::Start(intensity) => match driver.start(id, intensity) {
                Ok(handle) => {
                    info!(
                        target: "gpu_burner::daemon",
                        "GPU {} at {:.0}% < {}%, starting load at {:.2}", id, util, policy.threshold, intensity
                    );
                    self.handle = Some(handle);
                    self.state.running = true;
                    self.state.current_intensity = intensity;
                }
                Err(e) => {
                    error!(target: "gpu_burner::daemon", "GPU {} failed to start load: {}", id, e);
                }
            },
            ControlAction::Raise(intensity) | ControlAction::Lower(intensity) => {
                if let Some(handle) = &self.handle {
                    match driver.adjust(handle, intensity) {
                        Ok(()) => {
                            info!(
                                target: "gpu_burner::daemon",
                                "GPU {} at {:.0}% (threshold {}%), load {:.2} → {:.2}",
                                id, util, policy.threshold, self.state.current_intensity, intensity
                            );
                            self.state.current_intensity = intensity;
                        }
                        Err(e) => {
                            warn!(target: "gpu_burner::daemon", "GPU {} failed to adjust load: {}", id, e);
                        }
                    }
                }
            }
            ControlAction::Stop => {
                info!(
                    target: "gpu_burner::daemon",
                    "GPU {} at {:.0}% ≥ {}%, stopping load", id, util, policy.threshold
                );
                self.release(driver);
            }
            ControlAction::Hold => {
                debug!(target: "gpu_burner::daemon", "GPU {} at {:.0}%, load held at max {:.2}", id, util, self.state.current_intensity);
            }
            ControlAction::Idle => {
                debug!(target: "gpu_burner::daemon", "GPU {} at {:.0}%, no load needed", id, util);
            }
        }

        action
    }

    /// Stop the workload if one is running. Safe to call repeatedly.
    pub fn shutdown(&mut self, driver: &WorkloadDriver) {
        if self.state.running {
            info!(target: "gpu_burner::daemon", "GPU {} stopping load for shutdown", self.state.device_id);
        }
        self.release(driver);
    }

    pub fn status(&self, sampled: Option<&DeviceReading>) -> DeviceStatus {
        DeviceStatus {
            device_id: self.state.device_id,
            utilization_pct: sampled.map(|r| r.utilization_pct),
            intensity: self.state.current_intensity,
            running: self.state.running,
            backend: self.handle.as_ref().map(|h| h.backend()),
            batches_issued: self.handle.as_ref().map_or(0, |h| h.batches_issued()),
        }
    }

    fn release(&mut self, driver: &WorkloadDriver) {
        if let Some(mut handle) = self.handle.take() {
            driver.stop(&mut handle);
        }
        self.state.set_idle();
    }

    fn reap_dead_worker(&mut self) {
        if let Some(handle) = &self.handle
            && !handle.is_live()
        {
            warn!(
                target: "gpu_burner::daemon",
                "GPU {} load worker exited unexpectedly, back to idle", self.state.device_id
            );
            self.handle = None;
            self.state.set_idle();
        }
    }
}
