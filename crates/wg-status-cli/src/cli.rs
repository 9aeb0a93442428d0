//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use wg_status::{Backend, Panel, StatusConfig};

use crate::error::CliError;

/// Show `WireGuard` interface, peer and kernel module status.
#[derive(Parser, Debug, Clone)]
#[command(name = "wg-status")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Panel to show.
    #[arg(value_enum, default_value_t = PanelArg::All)]
    pub panel: PanelArg,

    /// Control interface to query.
    #[arg(short, long, value_enum, env = "WG_STATUS_BACKEND")]
    pub backend: Option<BackendArg>,

    /// Path to the `wg` binary.
    #[arg(long = "wg", value_name = "PATH", env = "WG_STATUS_WG")]
    pub wg_path: Option<PathBuf>,

    /// Read a saved `wg show all dump` instead of running `wg`.
    #[arg(long, value_name = "PATH", env = "WG_STATUS_DUMP_FILE")]
    pub dump_file: Option<PathBuf>,

    /// Prefix for `/sys` lookups.
    #[arg(long, value_name = "PATH", env = "WG_STATUS_SYSFS_ROOT")]
    pub sysfs_root: Option<PathBuf>,

    /// Per-query timeout in milliseconds.
    #[arg(short, long, value_name = "MS", env = "WG_STATUS_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// JSON configuration file. Flags override its values.
    #[arg(short, long, value_name = "FILE", env = "WG_STATUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Plain-text panels.
    #[default]
    Text,
    /// JSON document for scripting.
    Json,
}

/// Panel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PanelArg {
    /// Every panel.
    #[default]
    All,
    /// Interfaces with their peers.
    Connections,
    /// One summary row per interface.
    Interfaces,
    /// Tool and module versions.
    Version,
    /// Kernel module state.
    Kmod,
}

impl PanelArg {
    /// The library panel, or `None` for [`PanelArg::All`].
    #[must_use]
    pub const fn panel(self) -> Option<Panel> {
        match self {
            Self::All => None,
            Self::Connections => Some(Panel::Connections),
            Self::Interfaces => Some(Panel::Interfaces),
            Self::Version => Some(Panel::Version),
            Self::Kmod => Some(Panel::Kmod),
        }
    }
}

/// Backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// The `wg` userspace tool.
    Tool,
    /// Kernel netlink.
    Kernel,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Tool => Self::Tool,
            BackendArg::Kernel => Self::Kernel,
        }
    }
}

impl Cli {
    /// Builds the effective configuration: file values first, then flags.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the file cannot be loaded or the
    /// merged configuration is invalid.
    pub fn status_config(&self) -> Result<StatusConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => StatusConfig::load(path)?,
            None => StatusConfig::default(),
        };

        if let Some(backend) = self.backend {
            config = config.with_backend(backend.into());
        }
        if let Some(path) = &self.wg_path {
            config = config.with_wg_path(path);
        }
        if let Some(path) = &self.dump_file {
            config = config.with_dump_file(path);
        }
        if let Some(root) = &self.sysfs_root {
            config = config.with_sysfs_root(root);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout_ms(ms);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_all_panels_as_text() {
        let cli = Cli::parse_from(["wg-status"]);
        assert_eq!(cli.panel, PanelArg::All);
        assert_eq!(cli.format, Format::Text);
        assert!(cli.backend.is_none());
    }

    #[test]
    fn parses_panel_and_flags() {
        let cli = Cli::parse_from([
            "wg-status",
            "--format",
            "json",
            "--wg",
            "/usr/local/bin/wg",
            "--timeout-ms",
            "500",
            "kmod",
        ]);
        assert_eq!(cli.panel, PanelArg::Kmod);
        assert_eq!(cli.panel.panel(), Some(Panel::Kmod));
        assert_eq!(cli.format, Format::Json);
        assert_eq!(cli.timeout_ms, Some(500));
    }

    #[test]
    fn rejects_unknown_panel() {
        assert!(Cli::try_parse_from(["wg-status", "routes"]).is_err());
    }

    #[test]
    fn flags_build_config() {
        let cli = Cli::parse_from([
            "wg-status",
            "--backend",
            "tool",
            "--dump-file",
            "/tmp/wg.dump",
            "--sysfs-root",
            "/tmp/root",
            "-t",
            "750",
        ]);
        let config = cli.status_config().expect("config");
        assert_eq!(config.backend, Backend::Tool);
        assert_eq!(config.dump_file, Some(PathBuf::from("/tmp/wg.dump")));
        assert_eq!(config.sysfs_root, PathBuf::from("/tmp/root"));
        assert_eq!(config.timeout_ms, 750);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wg-status.json");
        std::fs::write(&path, r#"{ "wg_path": "/opt/wg", "timeout_ms": 100 }"#)
            .expect("write config");

        let cli = Cli::parse_from([
            "wg-status",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--timeout-ms",
            "900",
        ]);
        let config = cli.status_config().expect("config");
        assert_eq!(config.wg_path, PathBuf::from("/opt/wg"));
        assert_eq!(config.timeout_ms, 900);
    }

    #[test]
    fn zero_timeout_is_config_error() {
        let cli = Cli::parse_from(["wg-status", "--timeout-ms", "0"]);
        assert!(matches!(cli.status_config(), Err(CliError::Config(_))));
    }
}
