use crate::common::DEFAULT_CONFIG_PATH;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gpu-burner")]
#[command(version, about = "Keeps GPUs above a utilization floor with synthetic compute load")]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print the resolved configuration and exit
    #[arg(long, conflicts_with = "test_gpu")]
    pub print_config: bool,

    /// Sample every target GPU once, print a summary and exit
    #[arg(long)]
    pub test_gpu: bool,
}
