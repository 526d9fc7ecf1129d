use crate::common::BurnerError;
use crate::core::config::Settings;
use crate::core::monitor::{DeviceInfo, DeviceSampler};
use anyhow::Result;

/// Resolved configuration as YAML, for `--print-config`.
pub fn print_config(cfg: &Settings) -> Result<String> {
    cfg.to_yaml()
}

pub struct GpuCheck {
    pub device_id: u32,
    pub result: Result<DeviceInfo, BurnerError>,
}

pub struct GpuTestReport {
    pub checks: Vec<GpuCheck>,
}

impl GpuTestReport {
    pub fn all_reachable(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.result.is_ok())
    }

    pub fn unreachable(&self) -> impl Iterator<Item = u32> + '_ {
        self.checks
            .iter()
            .filter(|c| c.result.is_err())
            .map(|c| c.device_id)
    }
}

/// Sample every target once without starting any load.
pub fn test_gpu(sampler: &dyn DeviceSampler, targets: &[u32]) -> GpuTestReport {
    GpuTestReport {
        checks: targets
            .iter()
            .map(|&device_id| GpuCheck {
                device_id,
                result: sampler.describe(device_id),
            })
            .collect(),
    }
}
