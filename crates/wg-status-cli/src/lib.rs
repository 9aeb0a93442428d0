//! # wg-status-cli
//!
//! Command-line front end for the `wg-status` panels.
//!
//! ```text
//! wg-status [OPTIONS] [all|connections|interfaces|version|kmod]
//! ```
//!
//! Query failures render as "unavailable" panels and still exit 0. Only
//! configuration problems make the command fail.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod error;
pub mod output;
pub mod status;

pub use cli::{BackendArg, Cli, Format, PanelArg};
pub use error::CliError;
pub use output::OutputFormat;
pub use status::StatusCommand;

use std::io::Write;

use wg_status::{Backend, StatusAggregator, StatusConfig, ToolControl};

/// Runs the status command with the backend selected by `config`.
///
/// # Errors
///
/// Returns [`CliError::Unsupported`] for the kernel backend when built
/// without the `linux` feature, or [`CliError::Io`] if writing fails.
pub async fn run_with_config<W: Write>(
    config: &StatusConfig,
    command: &StatusCommand,
    writer: &mut W,
) -> Result<(), CliError> {
    tracing::debug!(backend = %config.backend, timeout_ms = config.timeout_ms, "querying status");
    match config.backend {
        Backend::Tool => {
            let aggregator =
                StatusAggregator::new(ToolControl::from_config(config)).with_timeout(config.timeout());
            command.execute(&aggregator, writer).await
        }
        #[cfg(feature = "linux")]
        Backend::Kernel => {
            let aggregator = StatusAggregator::new(wg_status::KernelControl::from_config(config))
                .with_timeout(config.timeout());
            command.execute(&aggregator, writer).await
        }
        #[cfg(not(feature = "linux"))]
        Backend::Kernel => Err(CliError::Unsupported(
            "kernel backend requires the `linux` feature".into(),
        )),
    }
}
