use crate::daemon::run::Daemon;
use crate::daemon::state::CycleSummary;
use tracing::{debug, info, warn};

impl Daemon {
    /// One sample → decide → act pass over every device. A device that cannot be
    /// sampled keeps its current state until the next cycle.
    pub fn tick(&mut self) -> CycleSummary {
        self.tick_count = self.tick_count.wrapping_add(1);
        debug!(target: "gpu_burner::daemon", "Tick #{}", self.tick_count);

        let mut statuses = Vec::with_capacity(self.controllers.len());

        for controller in &mut self.controllers {
            let id = controller.device_id();
            let reading = match self.sampler.sample(id) {
                Ok(reading) => {
                    controller.step(reading, &self.policy, &self.driver);
                    Some(reading)
                }
                Err(e) => {
                    warn!(target: "gpu_burner::daemon", "{}, skipped this cycle", e);
                    None
                }
            };
            statuses.push(controller.status(reading.as_ref()));
        }

        let summary = CycleSummary::from_devices(self.tick_count, statuses);
        self.log_summary(&summary);
        summary
    }

    fn log_summary(&self, summary: &CycleSummary) {
        match summary.average_utilization {
            Some(avg) => info!(
                target: "gpu_burner::daemon",
                "Average GPU utilization {:.1}%, threshold {}%, {} load(s) active",
                avg, self.policy.threshold, summary.active_devices()
            ),
            None => warn!(target: "gpu_burner::daemon", "No GPU utilization available this cycle"),
        }

        for (status, controller) in summary.devices.iter().zip(&self.controllers) {
            let load = if status.running {
                format!(
                    "running at {:.2} on {} ({} batches)",
                    status.intensity,
                    status.backend.unwrap_or("?"),
                    status.batches_issued
                )
            } else {
                "stopped".to_string()
            };
            match (status.utilization_pct, controller.state().last_reading) {
                (Some(_), Some(r)) => debug!(
                    target: "gpu_burner::daemon",
                    "GPU {} util={:.0}% mem={:.0}/{:.0}MB temp={:.0}°C load {}",
                    status.device_id, r.utilization_pct, r.memory_used_mb, r.memory_total_mb, r.temperature_c, load
                ),
                _ => debug!(target: "gpu_burner::daemon", "GPU {} unsampled, load {}", status.device_id, load),
            }
        }
    }
}
