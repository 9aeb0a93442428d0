//! WireGuard control-interface queries.
//!
//! [`ControlInterface`] is the read-only seam between the status page and
//! whatever actually holds WireGuard state: the `wg` tool
//! ([`ToolControl`](crate::tool::ToolControl)), kernel netlink
//! (`KernelControl`, behind the `linux` feature) or the in-memory
//! [`FakeControl`] used in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::error::{QueryError, Result};
use crate::keys::PublicKey;
use crate::types::{AllowedIp, Endpoint, InterfaceSnapshot, OperState, PeerSnapshot, VersionInfo};

/// Read-only queries against a WireGuard control interface.
#[allow(async_fn_in_trait)]
pub trait ControlInterface {
    /// Snapshots every WireGuard interface and its peers.
    ///
    /// Zero interfaces is an empty vector, not an error.
    async fn query_interfaces(&self) -> Result<Vec<InterfaceSnapshot>>;

    /// Whether the WireGuard kernel module is loaded.
    async fn query_module_state(&self) -> Result<bool>;

    /// Version exported by the kernel module, if any.
    async fn query_module_version(&self) -> Result<Option<String>>;

    /// Version of the WireGuard implementation.
    async fn query_version(&self) -> Result<VersionInfo>;
}

/// Failure modes [`FakeControl`] can be told to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FakeFailure {
    /// The control interface is unreachable.
    Unavailable,
    /// The caller is not privileged.
    PermissionDenied,
}

impl FakeFailure {
    fn to_error(self, operation: &str) -> QueryError {
        match self {
            Self::Unavailable => QueryError::unavailable(format!("fake: {operation}")),
            Self::PermissionDenied => QueryError::permission_denied(format!("fake: {operation}")),
        }
    }
}

/// Internal state for a fake interface.
#[derive(Clone, Debug)]
struct FakeInterfaceData {
    public_key: Option<PublicKey>,
    listen_port: Option<u16>,
    mtu: Option<u32>,
    state: OperState,
    peers: Vec<FakePeerData>,
}

/// Internal state for a fake peer.
#[derive(Clone, Debug)]
struct FakePeerData {
    public_key: PublicKey,
    preshared_key: bool,
    endpoint: Option<Endpoint>,
    allowed_ips: Vec<AllowedIp>,
    rx_bytes: u64,
    tx_bytes: u64,
    last_handshake: Option<u64>,
}

#[derive(Debug)]
struct FakeState {
    interfaces: HashMap<String, FakeInterfaceData>,
    module_loaded: bool,
    version: String,
    module_version: Option<String>,
    latency: Option<Duration>,
    interfaces_failure: Option<FakeFailure>,
    module_failure: Option<FakeFailure>,
    version_failure: Option<FakeFailure>,
}

/// An in-memory control interface for testing.
///
/// Interfaces are held in a hash map, so [`query_interfaces`] returns them
/// in arbitrary order just like a real daemon might.
///
/// [`query_interfaces`]: ControlInterface::query_interfaces
#[derive(Clone)]
pub struct FakeControl {
    state: Arc<RwLock<FakeState>>,
}

impl FakeControl {
    /// Creates an empty fake with the module loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(FakeState {
                interfaces: HashMap::new(),
                module_loaded: true,
                version: "v1.0.20210914".to_string(),
                module_version: None,
                latency: None,
                interfaces_failure: None,
                module_failure: None,
                version_failure: None,
            })),
        }
    }

    /// Adds an interface in the `up` state.
    pub async fn add_interface(
        &self,
        name: &str,
        public_key: Option<PublicKey>,
        listen_port: Option<u16>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if state.interfaces.contains_key(name) {
            return Err(QueryError::unavailable(format!("interface {name} exists")));
        }
        state.interfaces.insert(
            name.to_string(),
            FakeInterfaceData {
                public_key,
                listen_port,
                mtu: Some(1420),
                state: OperState::Up,
                peers: Vec::new(),
            },
        );
        Ok(())
    }

    /// Adds a peer to an interface.
    pub async fn add_peer(
        &self,
        interface_name: &str,
        public_key: PublicKey,
        endpoint: Option<Endpoint>,
        allowed_ips: Vec<AllowedIp>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let interface = state
            .interfaces
            .get_mut(interface_name)
            .ok_or_else(|| QueryError::unavailable(format!("no interface {interface_name}")))?;

        if interface.peers.iter().any(|p| p.public_key == public_key) {
            return Err(QueryError::duplicate_peer(
                interface_name,
                public_key.to_base64(),
            ));
        }

        interface.peers.push(FakePeerData {
            public_key,
            preshared_key: false,
            endpoint,
            allowed_ips,
            rx_bytes: 0,
            tx_bytes: 0,
            last_handshake: None,
        });
        Ok(())
    }

    /// Simulates traffic on a peer.
    pub async fn simulate_traffic(
        &self,
        interface_name: &str,
        public_key: &PublicKey,
        rx_bytes: u64,
        tx_bytes: u64,
    ) -> Result<()> {
        self.with_peer(interface_name, public_key, |peer| {
            peer.rx_bytes = peer.rx_bytes.saturating_add(rx_bytes);
            peer.tx_bytes = peer.tx_bytes.saturating_add(tx_bytes);
        })
        .await
    }

    /// Simulates a handshake with a peer.
    pub async fn simulate_handshake(
        &self,
        interface_name: &str,
        public_key: &PublicKey,
        timestamp: u64,
    ) -> Result<()> {
        self.with_peer(interface_name, public_key, |peer| {
            peer.last_handshake = Some(timestamp);
        })
        .await
    }

    /// Marks a peer as using a preshared key.
    pub async fn set_preshared_key(
        &self,
        interface_name: &str,
        public_key: &PublicKey,
    ) -> Result<()> {
        self.with_peer(interface_name, public_key, |peer| {
            peer.preshared_key = true;
        })
        .await
    }

    /// Sets the link state of an interface.
    pub async fn set_link_state(&self, interface_name: &str, link: OperState) -> Result<()> {
        let mut state = self.state.write().await;
        let interface = state
            .interfaces
            .get_mut(interface_name)
            .ok_or_else(|| QueryError::unavailable(format!("no interface {interface_name}")))?;
        interface.state = link;
        Ok(())
    }

    /// Sets whether the kernel module reports as loaded.
    pub async fn set_module_loaded(&self, loaded: bool, version: Option<&str>) {
        let mut state = self.state.write().await;
        state.module_loaded = loaded;
        state.module_version = version.map(str::to_string);
    }

    /// Sets the reported tool version.
    pub async fn set_version(&self, version: &str) {
        self.state.write().await.version = version.to_string();
    }

    /// Delays every query by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = Some(latency);
    }

    /// Makes `query_interfaces` fail.
    pub async fn fail_interfaces(&self, failure: FakeFailure) {
        self.state.write().await.interfaces_failure = Some(failure);
    }

    /// Makes `query_module_state` and `query_module_version` fail.
    pub async fn fail_module_state(&self, failure: FakeFailure) {
        self.state.write().await.module_failure = Some(failure);
    }

    /// Makes `query_version` fail.
    pub async fn fail_version(&self, failure: FakeFailure) {
        self.state.write().await.version_failure = Some(failure);
    }

    async fn with_peer(
        &self,
        interface_name: &str,
        public_key: &PublicKey,
        f: impl FnOnce(&mut FakePeerData),
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let interface = state
            .interfaces
            .get_mut(interface_name)
            .ok_or_else(|| QueryError::unavailable(format!("no interface {interface_name}")))?;
        let peer = interface
            .peers
            .iter_mut()
            .find(|p| p.public_key == *public_key)
            .ok_or_else(|| QueryError::unavailable(format!("no peer {public_key}")))?;
        f(peer);
        Ok(())
    }

    async fn delay(&self) {
        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for FakeControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlInterface for FakeControl {
    async fn query_interfaces(&self) -> Result<Vec<InterfaceSnapshot>> {
        self.delay().await;
        let state = self.state.read().await;
        if let Some(failure) = state.interfaces_failure {
            return Err(failure.to_error("query_interfaces"));
        }

        state
            .interfaces
            .iter()
            .map(|(name, data)| -> Result<InterfaceSnapshot> {
                let mut builder = InterfaceSnapshot::builder(name.as_str())
                    .public_key(data.public_key)
                    .listen_port(data.listen_port)
                    .mtu(data.mtu)
                    .state(data.state);
                for peer in &data.peers {
                    let mut pb = PeerSnapshot::builder(peer.public_key)
                        .preshared_key(peer.preshared_key)
                        .endpoint(peer.endpoint.clone())
                        .last_handshake(peer.last_handshake)
                        .transfer(peer.rx_bytes, peer.tx_bytes);
                    for ip in &peer.allowed_ips {
                        pb = pb.allowed_ip(ip.clone());
                    }
                    builder.push_peer(pb.build())?;
                }
                Ok(builder.build())
            })
            .collect()
    }

    async fn query_module_state(&self) -> Result<bool> {
        self.delay().await;
        let state = self.state.read().await;
        match state.module_failure {
            Some(failure) => Err(failure.to_error("query_module_state")),
            None => Ok(state.module_loaded),
        }
    }

    async fn query_module_version(&self) -> Result<Option<String>> {
        self.delay().await;
        let state = self.state.read().await;
        match state.module_failure {
            Some(failure) => Err(failure.to_error("query_module_version")),
            None => Ok(state.module_version.clone()),
        }
    }

    async fn query_version(&self) -> Result<VersionInfo> {
        self.delay().await;
        let state = self.state.read().await;
        if let Some(failure) = state.version_failure {
            return Err(failure.to_error("query_version"));
        }
        Ok(VersionInfo::new(state.version.clone(), state.module_loaded)
            .with_module_version(state.module_version.clone()))
    }
}
