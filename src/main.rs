use clap::Parser;
use cobie_graph::{AppConfig, CliArgs, LoggingConfig, RunStatus, init_logging, run};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let config = AppConfig::from_args(cli)?;

    match run(config).await? {
        RunStatus::Clean => Ok(ExitCode::SUCCESS),
        RunStatus::Problems => Ok(ExitCode::FAILURE),
    }
}
