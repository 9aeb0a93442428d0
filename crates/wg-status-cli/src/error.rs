//! CLI error types.

use thiserror::Error;
use wg_status::ConfigError;

/// CLI-specific errors.
///
/// Query failures are not errors here: they become "unavailable" panels.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The requested backend was not compiled in.
    #[error("unsupported backend: {0}")]
    Unsupported(String),
    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_config() {
        let err = CliError::from(ConfigError::Invalid("timeout_ms must be positive".into()));
        assert_eq!(
            err.to_string(),
            "configuration error: invalid configuration: timeout_ms must be positive"
        );
    }

    #[test]
    fn cli_error_display_unsupported() {
        let err = CliError::Unsupported("kernel".into());
        assert_eq!(err.to_string(), "unsupported backend: kernel");
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
