//! Aggregation of control-interface queries into status panels.
//!
//! [`StatusAggregator`] runs the three queries concurrently, each bounded by
//! a timeout, and renders the results. A failed query never aborts the
//! view: its panels show [`UNAVAILABLE`] and the error is logged.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DEFAULT_TIMEOUT_MS;
use crate::control::ControlInterface;
use crate::error::{QueryError, Result};
use crate::format::{
    connection_status, interface_status, module_status, version_status, UNAVAILABLE,
};
use crate::normalize::{normalize, StatusView};
use crate::types::{InterfaceSnapshot, VersionInfo};

/// One of the four status panels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    /// Interfaces with their peers.
    Connections,
    /// One summary row per interface.
    Interfaces,
    /// Tool and module versions.
    Version,
    /// Kernel module state.
    Kmod,
}

impl Panel {
    /// Every panel, in page order.
    pub const ALL: [Self; 4] = [Self::Connections, Self::Interfaces, Self::Version, Self::Kmod];

    /// Heading shown above the panel.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Connections => "Connection Status",
            Self::Interfaces => "Interface Status",
            Self::Version => "WireGuard Version",
            Self::Kmod => "Kernel Module Status",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// The rendered text of all four panels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// "Connection Status" panel.
    pub connection: String,
    /// "Interface Status" panel.
    pub interfaces: String,
    /// "WireGuard Version" panel.
    pub version: String,
    /// "Kernel Module Status" panel.
    pub kmod: String,
}

impl StatusReport {
    /// Text of a single panel.
    #[must_use]
    pub fn panel(&self, panel: Panel) -> &str {
        match panel {
            Panel::Connections => &self.connection,
            Panel::Interfaces => &self.interfaces,
            Panel::Version => &self.version,
            Panel::Kmod => &self.kmod,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, panel) in Panel::ALL.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "== {panel} ==")?;
            writeln!(f, "{}", self.panel(*panel))?;
        }
        Ok(())
    }
}

/// A query that failed while building a [`StatusDocument`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    /// Name of the failed query.
    pub query: String,
    /// Error message.
    pub message: String,
}

/// Structured status, for machine consumers.
///
/// Each field is `None` when its query failed; the failure is listed in
/// `errors`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDocument {
    /// Normalized interfaces and peers.
    pub interfaces: Option<StatusView>,
    /// Whether the kernel module is loaded.
    pub module_loaded: Option<bool>,
    /// Version exported by the kernel module, when loaded and known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_version: Option<String>,
    /// Version information.
    pub version: Option<VersionInfo>,
    /// Queries that failed.
    pub errors: Vec<QueryFailure>,
}

struct Gathered {
    interfaces: Result<Vec<InterfaceSnapshot>>,
    module: Result<(bool, Option<String>)>,
    version: Result<VersionInfo>,
}

/// Runs status queries against a control interface.
#[derive(Debug, Clone)]
pub struct StatusAggregator<C> {
    control: C,
    timeout: Duration,
}

impl<C: ControlInterface> StatusAggregator<C> {
    /// Creates an aggregator with the default timeout.
    #[must_use]
    pub fn new(control: C) -> Self {
        Self {
            control,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Sets the per-query timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The per-query timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Queries the control interface and renders all four panels.
    pub async fn collect(&self) -> StatusReport {
        let gathered = self.gather().await;

        let view = gathered.interfaces.map(normalize);
        let (connection, interfaces) = match &view {
            Ok(view) => (connection_status(view), interface_status(view)),
            Err(_) => (UNAVAILABLE.to_string(), UNAVAILABLE.to_string()),
        };

        let kmod = match &gathered.module {
            Ok((loaded, module_version)) => module_status(*loaded, module_version.as_deref()),
            Err(_) => UNAVAILABLE.to_string(),
        };

        let version = match &gathered.version {
            Ok(info) => version_status(info),
            Err(_) => UNAVAILABLE.to_string(),
        };

        StatusReport {
            connection,
            interfaces,
            version,
            kmod,
        }
    }

    /// Queries the control interface and returns structured status.
    pub async fn document(&self) -> StatusDocument {
        let gathered = self.gather().await;
        let mut errors = Vec::new();

        let interfaces = keep(gathered.interfaces, "interfaces", &mut errors).map(normalize);
        let (module_loaded, module_version) =
            match keep(gathered.module, "module_state", &mut errors) {
                Some((loaded, version)) => (Some(loaded), version),
                None => (None, None),
            };
        let version = keep(gathered.version, "version", &mut errors);

        StatusDocument {
            interfaces,
            module_loaded,
            module_version,
            version,
            errors,
        }
    }

    async fn gather(&self) -> Gathered {
        let (interfaces, module, version) = tokio::join!(
            self.bounded("interfaces", self.control.query_interfaces()),
            self.bounded("module_state", self.module()),
            self.bounded("version", self.control.query_version()),
        );
        Gathered {
            interfaces,
            module,
            version,
        }
    }

    /// Module state plus the module's own version. A version read failure
    /// only drops the version.
    async fn module(&self) -> Result<(bool, Option<String>)> {
        let loaded = self.control.query_module_state().await?;
        let version = match self.control.query_module_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, "module version query failed");
                None
            }
        };
        Ok((loaded, version))
    }

    async fn bounded<T>(
        &self,
        query: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::timeout(
                query,
                u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        };
        match &result {
            Ok(_) => debug!(query, "query succeeded"),
            Err(e) => warn!(
                query,
                error = %e,
                permission_denied = e.is_permission_denied(),
                transient = e.is_transient(),
                "status query failed; panel unavailable"
            ),
        }
        result
    }
}

fn keep<T>(result: Result<T>, query: &str, errors: &mut Vec<QueryFailure>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(QueryFailure {
                query: query.to_string(),
                message: e.to_string(),
            });
            None
        }
    }
}
