mod app;
mod executor;
pub mod output;

pub use app::Cli;
use crate::Result;
use std::process::ExitCode;

pub async fn run() -> Result<ExitCode> {
    use clap::Parser;

    let cli = Cli::parse();
    executor::execute(cli).await
}
