#![allow(dead_code)]

use gpu_burner::common::BurnerError;
use gpu_burner::core::config::{Settings, WorkloadConfig};
use gpu_burner::core::monitor::{DeviceInfo, DeviceReading, DeviceSampler};
use gpu_burner::core::workload::{BackendFactory, ComputeBackend, WorkloadDriver};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory sampler. Devices without a scripted utilization fail to sample.
#[derive(Clone, Default)]
pub struct ScriptedSampler {
    count: u32,
    utilization: Arc<Mutex<HashMap<u32, f64>>>,
}

impl ScriptedSampler {
    pub fn new(count: u32) -> Self {
        Self {
            count,
            utilization: Arc::default(),
        }
    }

    pub fn set(&self, device_id: u32, pct: f64) {
        self.utilization.lock().unwrap().insert(device_id, pct);
    }

    pub fn fail(&self, device_id: u32) {
        self.utilization.lock().unwrap().remove(&device_id);
    }
}

impl DeviceSampler for ScriptedSampler {
    fn device_count(&self) -> Result<u32, BurnerError> {
        Ok(self.count)
    }

    fn sample(&self, device_id: u32) -> Result<DeviceReading, BurnerError> {
        let util = self.utilization.lock().unwrap().get(&device_id).copied();
        match util {
            Some(pct) => Ok(DeviceReading {
                device_id,
                utilization_pct: pct,
                memory_used_mb: 512.0,
                memory_total_mb: 16384.0,
                temperature_c: 40.0,
            }),
            None => Err(BurnerError::unavailable(device_id, "scripted failure")),
        }
    }

    fn describe(&self, device_id: u32) -> Result<DeviceInfo, BurnerError> {
        Ok(DeviceInfo {
            name: format!("Scripted GPU {device_id}"),
            reading: self.sample(device_id)?,
        })
    }
}

struct CountingBackend {
    batches: Arc<AtomicU64>,
}

impl ComputeBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn issue_batch(&mut self, _matrix_size: usize, _batch_size: usize) -> anyhow::Result<()> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(1));
        Ok(())
    }
}

pub fn counting_driver(cfg: &WorkloadConfig) -> (WorkloadDriver, Arc<AtomicU64>) {
    let batches = Arc::new(AtomicU64::new(0));
    let counter = batches.clone();
    let factory: BackendFactory = Arc::new(move |_, _| {
        Ok(Box::new(CountingBackend {
            batches: counter.clone(),
        }) as Box<dyn ComputeBackend>)
    });
    (WorkloadDriver::with_factory(factory, cfg), batches)
}

struct FailingBackend;

impl ComputeBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn issue_batch(&mut self, _matrix_size: usize, _batch_size: usize) -> anyhow::Result<()> {
        anyhow::bail!("device lost")
    }
}

/// The first backend built fails on its first batch; later ones count normally.
pub fn failing_once_driver(cfg: &WorkloadConfig) -> (WorkloadDriver, Arc<AtomicU64>) {
    let built = Arc::new(AtomicU64::new(0));
    let counter = built.clone();
    let batches = Arc::new(AtomicU64::new(0));
    let factory: BackendFactory = Arc::new(move |_, _| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Box::new(FailingBackend) as Box<dyn ComputeBackend>)
        } else {
            Ok(Box::new(CountingBackend {
                batches: batches.clone(),
            }) as Box<dyn ComputeBackend>)
        }
    });
    (WorkloadDriver::with_factory(factory, cfg), built)
}

pub fn settings(targets: Vec<u32>, step: f64) -> Settings {
    let mut cfg = Settings {
        target_gpus: targets,
        utilization_threshold: 30.0,
        check_interval: 3600.0,
        ..Settings::default()
    };
    cfg.workload.base_intensity = 0.5;
    cfg.workload.max_intensity = 0.9;
    cfg.workload.intensity_step = step;
    cfg.workload.matrix_size = 8;
    cfg
}
