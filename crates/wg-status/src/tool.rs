//! Control interface backed by the `wg` userspace tool.
//!
//! Interface and peer state comes from `wg show all dump`, which works
//! against both the kernel module and userspace implementations. The dump
//! has no link attributes, so state and MTU are read from sysfs.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::config::StatusConfig;
use crate::control::ControlInterface;
use crate::dump::parse_dump;
use crate::error::{QueryError, Result};
use crate::sysfs::Sysfs;
use crate::types::{InterfaceSnapshot, VersionInfo};

/// Default name of the `wg` binary, resolved through `PATH`.
pub const DEFAULT_WG_PATH: &str = "wg";

/// Where the dump is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpSource {
    /// Run `wg show all dump`.
    Command,
    /// Read a previously saved dump from a file.
    File(PathBuf),
}

/// Control interface that shells out to `wg`.
#[derive(Debug, Clone)]
pub struct ToolControl {
    wg_path: PathBuf,
    source: DumpSource,
    sysfs: Sysfs,
}

impl ToolControl {
    /// Creates a control using `wg` from `PATH` and sysfs at `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wg_path: PathBuf::from(DEFAULT_WG_PATH),
            source: DumpSource::Command,
            sysfs: Sysfs::new(),
        }
    }

    /// Creates a control from a status configuration.
    #[must_use]
    pub fn from_config(config: &StatusConfig) -> Self {
        let source = match &config.dump_file {
            Some(path) => DumpSource::File(path.clone()),
            None => DumpSource::Command,
        };
        Self {
            wg_path: config.wg_path.clone(),
            source,
            sysfs: Sysfs::with_root(&config.sysfs_root),
        }
    }

    /// Uses a specific `wg` binary.
    #[must_use]
    pub fn with_wg_path(mut self, path: impl AsRef<Path>) -> Self {
        self.wg_path = path.as_ref().to_path_buf();
        self
    }

    /// Reads the dump from a file instead of running `wg`.
    #[must_use]
    pub fn with_dump_file(mut self, path: impl AsRef<Path>) -> Self {
        self.source = DumpSource::File(path.as_ref().to_path_buf());
        self
    }

    /// Uses a custom sysfs reader.
    #[must_use]
    pub fn with_sysfs(mut self, sysfs: Sysfs) -> Self {
        self.sysfs = sysfs;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let command_line = format!("{} {}", self.wg_path.display(), args.join(" "));
        debug!(command = %command_line, "running wg");

        let output = Command::new(&self.wg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => QueryError::unavailable(format!(
                    "{} not found: {e}",
                    self.wg_path.display()
                )),
                _ => QueryError::from_io(&command_line, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if is_permission_message(&stderr) {
                return Err(QueryError::permission_denied(stderr));
            }
            return Err(QueryError::command_failed(
                command_line,
                output.status.code().unwrap_or(-1),
                stderr,
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn read_dump(&self) -> Result<String> {
        match &self.source {
            DumpSource::Command => self.run(&["show", "all", "dump"]).await,
            DumpSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    QueryError::unavailable(format!("{} does not exist", path.display()))
                } else {
                    QueryError::from_io(&path.display().to_string(), e)
                }
            }),
        }
    }
}

impl Default for ToolControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlInterface for ToolControl {
    async fn query_interfaces(&self) -> Result<Vec<InterfaceSnapshot>> {
        let dump = self.read_dump().await?;
        let builders = parse_dump(&dump)?;

        let mut snapshots = Vec::with_capacity(builders.len());
        for builder in builders {
            let state = self.sysfs.link_state(builder.name()).await;
            let mtu = self.sysfs.mtu(builder.name()).await;
            snapshots.push(builder.state(state).mtu(mtu).build());
        }
        debug!(count = snapshots.len(), "parsed wg dump");
        Ok(snapshots)
    }

    async fn query_module_state(&self) -> Result<bool> {
        self.sysfs.module_loaded().await
    }

    async fn query_module_version(&self) -> Result<Option<String>> {
        Ok(self.sysfs.module_version().await)
    }

    async fn query_version(&self) -> Result<VersionInfo> {
        let version = match &self.source {
            DumpSource::Command => parse_version(&self.run(&["--version"]).await?)?,
            DumpSource::File(path) => {
                return Err(QueryError::unavailable(format!(
                    "version is not recorded in dump file {}",
                    path.display()
                )));
            }
        };
        let loaded = self.sysfs.module_loaded_or_warn().await;
        let module_version = self.sysfs.module_version().await;
        Ok(VersionInfo::new(version, loaded).with_module_version(module_version))
    }
}

/// Extracts the version from `wg --version` output.
///
/// `wireguard-tools v1.0.20210914 - https://git.zx2c4.com/wireguard-tools/`
/// yields `v1.0.20210914`. Output without a `v<digit>` token is returned
/// as its trimmed first line.
///
/// # Errors
///
/// Returns [`QueryError::Parse`] if the output is empty.
pub fn parse_version(output: &str) -> Result<String> {
    let first = output.lines().next().map(str::trim).unwrap_or_default();
    if first.is_empty() {
        return Err(QueryError::parse(1, "empty version output"));
    }
    let token = first.split_whitespace().find(|t| {
        let mut chars = t.chars();
        chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit())
    });
    Ok(token.unwrap_or(first).to_string())
}

fn is_permission_message(stderr: &str) -> bool {
    stderr.contains("Operation not permitted") || stderr.contains("Permission denied")
}
