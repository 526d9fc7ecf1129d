mod nvml;

use crate::common::BurnerError;
use serde::Serialize;

pub use nvml::NvmlSampler;

/// One device's hardware state at the moment it was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceReading {
    pub device_id: u32,
    pub utilization_pct: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub reading: DeviceReading,
}

/// Read-only view of the locally visible GPUs.
pub trait DeviceSampler: Send + Sync {
    fn device_count(&self) -> Result<u32, BurnerError>;

    fn sample(&self, device_id: u32) -> Result<DeviceReading, BurnerError>;

    fn describe(&self, device_id: u32) -> Result<DeviceInfo, BurnerError>;
}

pub fn create_sampler() -> Result<Box<dyn DeviceSampler>, BurnerError> {
    Ok(Box::new(NvmlSampler::init()?))
}
