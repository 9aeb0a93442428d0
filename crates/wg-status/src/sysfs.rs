//! Linux sysfs reader for link attributes and module state.
//!
//! All paths are resolved under a configurable root so tests can point the
//! reader at a fabricated tree.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{QueryError, Result};
use crate::types::OperState;

/// Name of the WireGuard kernel module.
pub const MODULE_NAME: &str = "wireguard";

/// `IFF_UP` from `<linux/if.h>`.
const IFF_UP: u32 = 0x1;

/// Reads WireGuard-related attributes from sysfs.
#[derive(Debug, Clone)]
pub struct Sysfs {
    root: PathBuf,
}

impl Sysfs {
    /// Creates a reader rooted at `/`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Creates a reader rooted at a custom path.
    #[must_use]
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn net_dir(&self) -> PathBuf {
        self.root.join("sys/class/net")
    }

    fn module_dir(&self) -> PathBuf {
        self.root.join("sys/module").join(MODULE_NAME)
    }

    /// Administrative state of a link, from the `IFF_UP` bit of its flags.
    ///
    /// Missing or unreadable attributes yield [`OperState::Unknown`].
    pub async fn link_state(&self, ifname: &str) -> OperState {
        let path = self.net_dir().join(ifname).join("flags");
        match read_trimmed(&path).await {
            Ok(Some(raw)) => match parse_flags(&raw) {
                Some(flags) if flags & IFF_UP != 0 => OperState::Up,
                Some(_) => OperState::Down,
                None => {
                    debug!(path = %path.display(), value = %raw, "unparseable link flags");
                    OperState::Unknown
                }
            },
            Ok(None) | Err(_) => OperState::Unknown,
        }
    }

    /// Link MTU, if the attribute exists and is numeric.
    pub async fn mtu(&self, ifname: &str) -> Option<u32> {
        let path = self.net_dir().join(ifname).join("mtu");
        read_trimmed(&path).await.ok().flatten()?.parse().ok()
    }

    /// Names of links whose `uevent` declares `DEVTYPE=wireguard`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Unavailable`] if the net class directory is
    /// missing, or [`QueryError::PermissionDenied`] if it cannot be read.
    pub async fn wireguard_links(&self) -> Result<Vec<String>> {
        let dir = self.net_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(QueryError::unavailable(format!(
                    "{} does not exist",
                    dir.display()
                )));
            }
            Err(e) => return Err(QueryError::from_io(&dir.display().to_string(), e)),
        };

        let needle = format!("DEVTYPE={MODULE_NAME}");
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| QueryError::from_io(&dir.display().to_string(), e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let uevent = entry.path().join("uevent");
            if let Ok(Some(contents)) = read_trimmed(&uevent).await {
                if contents.lines().any(|l| l.trim() == needle) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Whether the WireGuard module is loaded (or built in).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::PermissionDenied`] if sysfs refuses access.
    pub async fn module_loaded(&self) -> Result<bool> {
        let dir = self.module_dir();
        match fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(QueryError::from_io(&dir.display().to_string(), e)),
        }
    }

    /// Like [`module_loaded`](Self::module_loaded), but an unreadable module
    /// directory is logged and reported as not loaded.
    pub async fn module_loaded_or_warn(&self) -> bool {
        match self.module_loaded().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "cannot read module state; assuming not loaded");
                false
            }
        }
    }

    /// Version string exported by the module, if any.
    pub async fn module_version(&self) -> Option<String> {
        let path = self.module_dir().join("version");
        read_trimmed(&path).await.ok().flatten()
    }
}

impl Default for Sysfs {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a file and trims whitespace. `Ok(None)` when absent or empty.
async fn read_trimmed(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(s) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(QueryError::from_io(&path.display().to_string(), e)),
    }
}

fn parse_flags(raw: &str) -> Option<u32> {
    match raw.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}
