use crate::common::{BurnerError, DEFAULT_LOG_FILE, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_target_gpus")]
    pub target_gpus: Vec<u32>,

    #[serde(default = "default_threshold")]
    pub utilization_threshold: f64,

    /// Seconds between control cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval: f64,

    #[serde(default)]
    pub workload: WorkloadConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkloadConfig {
    #[serde(default = "default_base_intensity")]
    pub base_intensity: f64,

    #[serde(default = "default_max_intensity")]
    pub max_intensity: f64,

    #[serde(default = "default_intensity_step")]
    pub intensity_step: f64,

    #[serde(default = "default_matrix_size")]
    pub matrix_size: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

/// Where the resolved settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    CreatedDefault(PathBuf),
    /// The file was missing and writing the default one failed.
    DefaultsOnly(String),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_gpus: default_target_gpus(),
            utilization_threshold: default_threshold(),
            check_interval: default_check_interval(),
            workload: WorkloadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            base_intensity: default_base_intensity(),
            max_intensity: default_max_intensity(),
            intensity_step: default_intensity_step(),
            matrix_size: default_matrix_size(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            file: default_log_file(),
        }
    }
}

impl Settings {
    /// Parse YAML over the defaults. An empty document yields the defaults.
    pub fn from_yaml(content: &str) -> Result<Self, BurnerError> {
        let settings = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| BurnerError::invalid("yaml", e))?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file, writing the defaults there first if it does not exist.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, ConfigSource), BurnerError> {
        let path = path.as_ref();

        if !path.exists() {
            let settings = Self::default();
            let source = match settings.save(path) {
                Ok(()) => ConfigSource::CreatedDefault(path.to_path_buf()),
                Err(e) => ConfigSource::DefaultsOnly(format!(
                    "cannot write {}: {e:#}",
                    path.display()
                )),
            };
            return Ok((settings, source));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| BurnerError::invalid("config", format!("cannot read {}: {e}", path.display())))?;

        Ok((Self::from_yaml(&content)?, ConfigSource::File(path.to_path_buf())))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        use anyhow::Context;

        let path = path.as_ref();
        let yaml = self.to_yaml()?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Falls back to the default interval for values `validate` would reject.
    pub fn check_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.check_interval)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_check_interval()))
    }

    /// Check every field and report all violations at once.
    pub fn validate(&self) -> Result<(), BurnerError> {
        let mut errors = Vec::new();
        let mut fail = |field: &str, reason: &str| errors.push(format!("{field}: {reason}"));

        if self.target_gpus.is_empty() {
            fail("target_gpus", "must be a non-empty list");
        } else {
            let mut seen = self.target_gpus.clone();
            seen.sort_unstable();
            seen.dedup();
            if seen.len() != self.target_gpus.len() {
                fail("target_gpus", "must not list the same GPU twice");
            }
        }

        if !(0.0..=100.0).contains(&self.utilization_threshold) {
            fail("utilization_threshold", "must be between 0 and 100");
        }

        if !self.check_interval.is_finite() || self.check_interval <= 0.0 {
            fail("check_interval", "must be a positive number of seconds");
        } else if Duration::try_from_secs_f64(self.check_interval).is_err() {
            fail("check_interval", "is too large");
        }

        let w = &self.workload;
        if !in_unit_range(w.base_intensity) {
            fail("workload.base_intensity", "must be in (0, 1]");
        }
        if !in_unit_range(w.max_intensity) {
            fail("workload.max_intensity", "must be in (0, 1]");
        }
        if w.base_intensity > w.max_intensity {
            fail("workload.base_intensity", "must not exceed workload.max_intensity");
        }
        if !in_unit_range(w.intensity_step) {
            fail("workload.intensity_step", "must be in (0, 1]");
        }
        if w.matrix_size == 0 {
            fail("workload.matrix_size", "must be a positive integer");
        }
        if w.batch_size == 0 {
            fail("workload.batch_size", "must be a positive integer");
        }

        if self.logging.file.as_os_str().is_empty() {
            fail("logging.file", "must not be empty");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BurnerError::ConfigInvalid(errors))
        }
    }
}

fn in_unit_range(v: f64) -> bool {
    v > 0.0 && v <= 1.0
}

fn default_target_gpus() -> Vec<u32> {
    vec![0]
}

fn default_threshold() -> f64 {
    30.0
}

fn default_check_interval() -> f64 {
    5.0
}

fn default_base_intensity() -> f64 {
    0.5
}

fn default_max_intensity() -> f64 {
    0.9
}

fn default_intensity_step() -> f64 {
    0.1
}

fn default_matrix_size() -> usize {
    2048
}

fn default_batch_size() -> usize {
    10
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_errors(yaml: &str) -> Vec<String> {
        match Settings::from_yaml(yaml) {
            Err(BurnerError::ConfigInvalid(errors)) => errors,
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let yaml = r#"
target_gpus: [0, 2]
utilization_threshold: 45
workload:
  matrix_size: 1024
logging:
  level: DEBUG
"#;
        let s = Settings::from_yaml(yaml).unwrap();
        assert_eq!(s.target_gpus, vec![0, 2]);
        assert_eq!(s.utilization_threshold, 45.0);
        assert_eq!(s.check_interval, 5.0);
        assert_eq!(s.workload.matrix_size, 1024);
        assert_eq!(s.workload.batch_size, 10);
        assert_eq!(s.workload.base_intensity, 0.5);
        assert_eq!(s.logging.level, LogLevel::Debug);
        assert_eq!(s.logging.file, PathBuf::from("gpu_burner.log"));
    }

    #[test]
    fn test_empty_document_is_defaults() {
        assert_eq!(Settings::from_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_warning_level_aliases() {
        let s = Settings::from_yaml("logging:\n  level: WARN\n").unwrap();
        assert_eq!(s.logging.level, LogLevel::Warning);
        assert_eq!(s.logging.level.as_filter(), "warn");

        let s = Settings::from_yaml("logging:\n  level: CRITICAL\n").unwrap();
        assert_eq!(s.logging.level.as_filter(), "error");
    }

    #[test]
    fn test_reports_every_bad_field() {
        let yaml = r#"
target_gpus: []
utilization_threshold: 140
check_interval: 1e20
workload:
  base_intensity: 0.95
  max_intensity: 0.9
  batch_size: 0
"#;
        let errors = config_errors(yaml);
        let fields: Vec<&str> = errors
            .iter()
            .map(|e| e.split(':').next().unwrap())
            .collect();
        assert_eq!(
            fields,
            vec![
                "target_gpus",
                "utilization_threshold",
                "check_interval",
                "workload.base_intensity",
                "workload.batch_size",
            ]
        );
    }

    #[test]
    fn test_duplicate_gpu_rejected() {
        let errors = config_errors("target_gpus: [1, 1]\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("target_gpus"));
    }

    #[test]
    fn test_type_errors_are_config_invalid() {
        let errors = config_errors("target_gpus: [-1]\n");
        assert!(errors[0].starts_with("yaml"));

        let errors = config_errors("logging:\n  level: LOUD\n");
        assert!(errors[0].starts_with("yaml"));
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let (settings, source) = Settings::load_or_create(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(source, ConfigSource::CreatedDefault(path.clone()));
        assert!(path.exists());

        let (reloaded, source) = Settings::load_or_create(&path).unwrap();
        assert_eq!(reloaded, settings);
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn test_check_interval_duration() {
        let s = Settings {
            check_interval: 0.25,
            ..Settings::default()
        };
        assert_eq!(s.check_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_oversized_check_interval_rejected() {
        let errors = config_errors("check_interval: 1e20\n");
        assert_eq!(errors, vec!["check_interval: is too large".to_string()]);

        let s = Settings {
            check_interval: 1e20,
            ..Settings::default()
        };
        assert_eq!(s.check_interval(), Duration::from_secs(5));
    }
}
