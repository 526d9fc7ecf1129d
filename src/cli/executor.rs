use super::{app::Cli, output};
use crate::core::config::{ConfigSource, Settings};
use crate::core::monitor;
use crate::daemon::{self, diag};
use crate::{Context, Result, logging};
use std::process::ExitCode;
use tracing::{info, warn};

pub async fn execute(cli: Cli) -> Result<ExitCode> {
    let (settings, source) = Settings::load_or_create(&cli.config)?;

    if cli.print_config {
        let yaml = diag::print_config(&settings)?;
        output::print_config(&cli.config, &yaml);
        return Ok(ExitCode::SUCCESS);
    }

    if cli.test_gpu {
        return Ok(handle_test_gpu(&settings));
    }

    logging::init(&settings.logging).context("Failed to set up logging")?;

    info!(
        target: "gpu_burner::config",
        "GPU Burner v{} (targets={:?}, threshold={}%, interval={}s)",
        env!("CARGO_PKG_VERSION"),
        settings.target_gpus,
        settings.utilization_threshold,
        settings.check_interval
    );
    match &source {
        ConfigSource::File(path) => {
            info!(target: "gpu_burner::config", "Loaded config from {}", path.display())
        }
        ConfigSource::CreatedDefault(path) => {
            info!(target: "gpu_burner::config", "Created default config at {}", path.display())
        }
        ConfigSource::DefaultsOnly(reason) => {
            warn!(target: "gpu_burner::config", "Using built-in defaults ({})", reason)
        }
    }

    daemon::run_with_config(settings).await?;
    Ok(ExitCode::SUCCESS)
}

fn handle_test_gpu(settings: &Settings) -> ExitCode {
    output::print_test_header();

    let sampler = match monitor::create_sampler() {
        Ok(s) => s,
        Err(e) => {
            output::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let report = diag::test_gpu(sampler.as_ref(), &settings.target_gpus);
    output::print_gpu_report(&report);

    if report.all_reachable() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
