//! Status aggregator configuration.
//!
//! A [`StatusConfig`] can be built in code, or loaded from a JSON file in
//! which every field is optional:
//!
//! ```json
//! { "backend": "tool", "wg_path": "/usr/bin/wg", "timeout_ms": 2000 }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tool::DEFAULT_WG_PATH;

/// Default per-query timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`StatusConfig`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A value is out of range or conflicts with another.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which control interface to query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The `wg` userspace tool.
    #[default]
    Tool,
    /// Kernel netlink (requires the `linux` feature).
    Kernel,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool => f.write_str("tool"),
            Self::Kernel => f.write_str("kernel"),
        }
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tool" => Ok(Self::Tool),
            "kernel" => Ok(Self::Kernel),
            other => Err(ConfigError::Invalid(format!("unknown backend {other:?}"))),
        }
    }
}

/// Configuration for status queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusConfig {
    /// Control interface to query.
    pub backend: Backend,
    /// Path or name of the `wg` binary.
    pub wg_path: PathBuf,
    /// Read a saved `wg show all dump` instead of running `wg`.
    pub dump_file: Option<PathBuf>,
    /// Prefix for `/sys` lookups.
    pub sysfs_root: PathBuf,
    /// Per-query timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Tool,
            wg_path: PathBuf::from(DEFAULT_WG_PATH),
            dump_file: None,
            sysfs_root: PathBuf::from("/"),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl StatusConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the `wg` binary.
    #[must_use]
    pub fn with_wg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.wg_path = path.into();
        self
    }

    /// Reads the dump from a file.
    #[must_use]
    pub fn with_dump_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_file = Some(path.into());
        self
    }

    /// Sets the sysfs root.
    #[must_use]
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    /// Sets the per-query timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// The per-query timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Checks value ranges and option conflicts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".into()));
        }
        if self.backend == Backend::Kernel && self.dump_file.is_some() {
            return Err(ConfigError::Invalid(
                "dump_file is only supported by the tool backend".into(),
            ));
        }
        if self.wg_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("wg_path must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StatusConfig::default();
        assert_eq!(config.backend, Backend::Tool);
        assert_eq!(config.wg_path, PathBuf::from("wg"));
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_partial_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wg-status.json");
        std::fs::write(&path, r#"{ "wg_path": "/usr/bin/wg", "timeout_ms": 500 }"#)
            .expect("write config");

        let config = StatusConfig::load(&path).expect("load");
        assert_eq!(config.wg_path, PathBuf::from("/usr/bin/wg"));
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.backend, Backend::Tool);
        assert_eq!(config.sysfs_root, PathBuf::from("/"));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wg-status.json");
        std::fs::write(&path, r#"{ "timeout": 500 }"#).expect("write config");
        assert!(matches!(
            StatusConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            StatusConfig::load(&dir.path().join("absent.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let config = StatusConfig::new().with_timeout_ms(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn kernel_backend_rejects_dump_file() {
        let config = StatusConfig::new()
            .with_backend(Backend::Kernel)
            .with_dump_file("/tmp/wg.dump");
        assert!(config.validate().is_err());
    }

    #[test]
    fn backend_from_str() {
        assert_eq!("TOOL".parse::<Backend>().expect("parse"), Backend::Tool);
        assert_eq!("kernel".parse::<Backend>().expect("parse"), Backend::Kernel);
        assert!("netlink".parse::<Backend>().is_err());
    }
}
