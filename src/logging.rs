use crate::common::BurnerError;
use crate::core::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Mutex;
use time::macros::format_description;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Console plus append-only file sink. `RUST_LOG` overrides `logging.level`.
pub fn init(cfg: &LoggingConfig) -> Result<()> {
    if let Some(parent) = cfg.file.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            BurnerError::invalid("logging.file", format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.file)
        .map_err(|e| {
            BurnerError::invalid("logging.file", format!("cannot open {}: {e}", cfg.file.display()))
        })?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.as_filter()));
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(timer.clone())
                .with_writer(std::io::stdout),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(timer)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::LogLevel;

    #[test]
    fn test_unopenable_log_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LoggingConfig {
            level: LogLevel::Info,
            file: dir.path().to_path_buf(),
        };

        let err = init(&cfg).unwrap_err();
        match err.downcast_ref::<BurnerError>() {
            Some(BurnerError::ConfigInvalid(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].starts_with("logging.file"));
            }
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }
}
