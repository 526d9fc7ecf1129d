use thiserror::Error;

/// Failures the burner distinguishes between. Anything else travels as `anyhow::Error`.
#[derive(Error, Debug)]
pub enum BurnerError {
    #[error("GPU {device_id} unavailable: {reason}")]
    DeviceUnavailable { device_id: u32, reason: String },

    #[error("compute backend degraded: {0}")]
    BackendDegraded(String),

    #[error("invalid configuration: {}", .0.join("; "))]
    ConfigInvalid(Vec<String>),
}

impl BurnerError {
    pub fn unavailable(device_id: u32, reason: impl ToString) -> Self {
        Self::DeviceUnavailable {
            device_id,
            reason: reason.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl std::fmt::Display) -> Self {
        Self::ConfigInvalid(vec![format!("{field}: {reason}")])
    }

    /// Only configuration errors stop the process; the rest are logged and survived.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigInvalid(_))
    }

    pub fn is_device_issue(&self) -> bool {
        matches!(self, Self::DeviceUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_properties() {
        let dev = BurnerError::unavailable(1, "driver not loaded");
        assert!(dev.is_device_issue());
        assert!(!dev.is_fatal());

        let degraded = BurnerError::BackendDegraded("no CUDA".into());
        assert!(!degraded.is_device_issue());
        assert!(!degraded.is_fatal());

        let cfg = BurnerError::invalid("check_interval", "must be positive");
        assert!(cfg.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = BurnerError::unavailable(3, "invalid index");
        assert_eq!(err.to_string(), "GPU 3 unavailable: invalid index");

        let err = BurnerError::ConfigInvalid(vec![
            "target_gpus: must not be empty".into(),
            "workload.batch_size: must be positive".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: target_gpus: must not be empty; workload.batch_size: must be positive"
        );
    }
}
