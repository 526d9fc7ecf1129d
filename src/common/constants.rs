pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_LOG_FILE: &str = "gpu_burner.log";

/// Below this, an intensity is treated as zero.
pub const INTENSITY_EPSILON: f64 = 1e-6;

/// Longest pause a burn worker takes between batches (at intensity 0).
pub const MAX_BURN_PAUSE_MS: u64 = 100;
