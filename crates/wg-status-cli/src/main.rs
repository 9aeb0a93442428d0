//! `wg-status` binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wg_status_cli::{run_with_config, Cli, CliError, OutputFormat, StatusCommand};

fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only panel output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.status_config()?;
    let command = StatusCommand::new(cli.panel.panel(), OutputFormat::new(cli.format));
    let mut stdout = io::stdout().lock();
    run_with_config(&config, &command, &mut stdout).await
}
