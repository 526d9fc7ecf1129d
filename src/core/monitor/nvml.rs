use super::{DeviceInfo, DeviceReading, DeviceSampler};
use crate::common::BurnerError;
use nvml_wrapper::Nvml;
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::error::NvmlError;
use tracing::{debug, info};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Sampler backed by the NVIDIA Management Library. The library is loaded at runtime,
/// so a host without the driver fails in `init`, not at link time.
pub struct NvmlSampler {
    nvml: Nvml,
    device_count: u32,
}

impl NvmlSampler {
    pub fn init() -> Result<Self, BurnerError> {
        let nvml = Nvml::init().map_err(|e| BurnerError::DeviceUnavailable {
            device_id: 0,
            reason: format!("NVML init failed: {e}"),
        })?;
        let device_count = nvml
            .device_count()
            .map_err(|e| BurnerError::unavailable(0, format!("NVML device count failed: {e}")))?;

        info!(target: "gpu_burner::monitor", "NVML ready, {} GPU device(s) visible", device_count);
        Ok(Self { nvml, device_count })
    }

    fn device(&self, device_id: u32) -> Result<nvml_wrapper::Device<'_>, BurnerError> {
        if device_id >= self.device_count {
            return Err(BurnerError::unavailable(
                device_id,
                format!("index out of range ({} visible)", self.device_count),
            ));
        }
        self.nvml
            .device_by_index(device_id)
            .map_err(|e| nvml_error(device_id, e))
    }
}

impl DeviceSampler for NvmlSampler {
    fn device_count(&self) -> Result<u32, BurnerError> {
        Ok(self.device_count)
    }

    fn sample(&self, device_id: u32) -> Result<DeviceReading, BurnerError> {
        let device = self.device(device_id)?;

        let util = device
            .utilization_rates()
            .map_err(|e| nvml_error(device_id, e))?;
        let memory = device.memory_info().map_err(|e| nvml_error(device_id, e))?;
        let temperature = device
            .temperature(TemperatureSensor::Gpu)
            .map_err(|e| nvml_error(device_id, e))?;

        let reading = DeviceReading {
            device_id,
            utilization_pct: f64::from(util.gpu),
            memory_used_mb: memory.used as f64 / BYTES_PER_MB,
            memory_total_mb: memory.total as f64 / BYTES_PER_MB,
            temperature_c: f64::from(temperature),
        };
        debug!(target: "gpu_burner::monitor", "{:?}", reading);
        Ok(reading)
    }

    fn describe(&self, device_id: u32) -> Result<DeviceInfo, BurnerError> {
        let name = self
            .device(device_id)?
            .name()
            .map_err(|e| nvml_error(device_id, e))?;
        Ok(DeviceInfo {
            name,
            reading: self.sample(device_id)?,
        })
    }
}

fn nvml_error(device_id: u32, e: NvmlError) -> BurnerError {
    let reason = match e {
        NvmlError::NoPermission => "permission denied".to_string(),
        NvmlError::InvalidArg => "invalid device index".to_string(),
        NvmlError::GpuLost => "GPU has fallen off the bus".to_string(),
        other => other.to_string(),
    };
    BurnerError::unavailable(device_id, reason)
}
