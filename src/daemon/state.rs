use crate::core::monitor::DeviceReading;
use serde::Serialize;

/// Control state of one device. Idle means `running == false` and zero intensity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub device_id: u32,
    pub current_intensity: f64,
    pub running: bool,
    pub last_reading: Option<DeviceReading>,
}

impl DeviceState {
    pub fn new(device_id: u32) -> Self {
        Self {
            device_id,
            current_intensity: 0.0,
            running: false,
            last_reading: None,
        }
    }

    pub fn set_idle(&mut self) {
        self.running = false;
        self.current_intensity = 0.0;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    pub device_id: u32,
    /// `None` when the device could not be sampled this cycle.
    pub utilization_pct: Option<f64>,
    pub intensity: f64,
    pub running: bool,
    pub backend: Option<&'static str>,
    pub batches_issued: u64,
}

/// What one cycle saw and did. Reported only; never fed back into decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub cycle: u64,
    pub average_utilization: Option<f64>,
    pub devices: Vec<DeviceStatus>,
}

impl CycleSummary {
    pub fn from_devices(cycle: u64, devices: Vec<DeviceStatus>) -> Self {
        let sampled: Vec<f64> = devices.iter().filter_map(|d| d.utilization_pct).collect();
        let average_utilization = if sampled.is_empty() {
            None
        } else {
            Some(sampled.iter().sum::<f64>() / sampled.len() as f64)
        };
        Self {
            cycle,
            average_utilization,
            devices,
        }
    }

    pub fn active_devices(&self) -> usize {
        self.devices.iter().filter(|d| d.running).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(device_id: u32, utilization_pct: Option<f64>) -> DeviceStatus {
        DeviceStatus {
            device_id,
            utilization_pct,
            intensity: 0.0,
            running: false,
            backend: None,
            batches_issued: 0,
        }
    }

    #[test]
    fn test_average_skips_unsampled_devices() {
        let summary = CycleSummary::from_devices(
            1,
            vec![status(0, Some(20.0)), status(1, None), status(2, Some(40.0))],
        );
        assert_eq!(summary.average_utilization, Some(30.0));
    }

    #[test]
    fn test_average_none_when_nothing_sampled() {
        let summary = CycleSummary::from_devices(7, vec![status(0, None)]);
        assert_eq!(summary.average_utilization, None);
        assert_eq!(summary.active_devices(), 0);
    }
}
