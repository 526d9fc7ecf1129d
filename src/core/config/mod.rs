mod settings;

pub use settings::{ConfigSource, LoggingConfig, Settings, WorkloadConfig};
