//! Error types for WireGuard status queries.
//!
//! Every failure a control-interface query can hit is a [`QueryError`].
//! None of them are fatal to a status page: the aggregator turns each one
//! into an "unavailable" panel and logs it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for status queries.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors that can occur while querying WireGuard state.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The control interface (tool, socket or netlink) cannot be reached.
    #[error("control interface unavailable: {message}")]
    Unavailable {
        /// Additional context about the error.
        message: String,
    },

    /// The caller lacks the privileges to read WireGuard state.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Additional context about the error.
        message: String,
    },

    /// The query did not complete in time.
    #[error("timeout: {operation} did not complete within {timeout_ms} ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// A control command ran but exited unsuccessfully.
    #[error("command failed: {command} exited with {exit_code}: {stderr}")]
    CommandFailed {
        /// The command that was executed.
        command: String,
        /// Exit code of the command (-1 when killed by a signal).
        exit_code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// Control output could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number of the offending input.
        line: usize,
        /// Description of the parse error.
        message: String,
    },

    /// The same peer public key appeared twice on one interface.
    #[error("duplicate peer {public_key} on interface {interface}")]
    DuplicatePeer {
        /// Interface name.
        interface: String,
        /// Base64 public key of the repeated peer.
        public_key: String,
    },

    /// A sysfs attribute existed but held an unexpected value.
    #[error("invalid sysfs attribute {path}: {message}")]
    InvalidAttribute {
        /// Path of the attribute.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Invalid key format.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Invalid key length.
    #[error("invalid key length: expected 32, got {0}")]
    InvalidKeyLength(usize),

    /// Invalid CIDR notation.
    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    /// Invalid endpoint address.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// IO error (file operations, process I/O).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// Creates an `Unavailable` error with a message.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a `PermissionDenied` error with a message.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a `CommandFailed` error.
    #[must_use]
    pub fn command_failed(
        command: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Creates a `Parse` error for the given 1-based line.
    #[must_use]
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Creates a `DuplicatePeer` error.
    #[must_use]
    pub fn duplicate_peer(interface: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self::DuplicatePeer {
            interface: interface.into(),
            public_key: public_key.into(),
        }
    }

    /// Creates an `InvalidAttribute` error.
    #[must_use]
    pub fn invalid_attribute(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Maps an IO error, promoting `PermissionDenied` to its own variant.
    #[must_use]
    pub fn from_io(context: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::permission_denied(format!("{context}: {err}"))
        } else {
            Self::Io(err)
        }
    }

    /// Returns `true` if this error is a privilege problem.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Returns `true` if this error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if retrying the query later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::CommandFailed { .. }
        )
    }
}
