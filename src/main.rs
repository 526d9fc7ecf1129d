use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> gpu_burner::Result<ExitCode> {
    gpu_burner::cli::run().await
}
