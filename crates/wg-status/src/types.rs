//! Snapshot types for `WireGuard` state.
//!
//! Snapshots are point-in-time, read-only views of the kernel or userspace
//! daemon. They are built once per query and never mutated afterwards, so
//! their fields are private and exposed through accessors.

use std::collections::BTreeSet;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::keys::PublicKey;

/// An allowed IP address or network in CIDR notation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllowedIp {
    network: IpNet,
}

impl AllowedIp {
    /// Creates a new allowed IP from an `IpNet`.
    #[must_use]
    pub fn new(network: IpNet) -> Self {
        Self { network }
    }

    /// Returns the network.
    #[must_use]
    pub fn network(&self) -> &IpNet {
        &self.network
    }

    /// Creates an allowed IP from CIDR notation.
    ///
    /// # Errors
    ///
    /// Returns an error if the CIDR notation is invalid.
    pub fn from_cidr(s: &str) -> Result<Self> {
        let network = s
            .parse::<IpNet>()
            .map_err(|e| QueryError::InvalidCidr(format!("{s}: {e}")))?;
        Ok(Self { network })
    }
}

impl FromStr for AllowedIp {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self> {
        Self::from_cidr(s)
    }
}

impl fmt::Display for AllowedIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network)
    }
}

/// A `WireGuard` peer endpoint.
///
/// Link-local IPv6 endpoints keep their zone (`[fe80::1%eth0]:51820`) as
/// text, since interface names cannot live in a `SocketAddrV6` scope id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    address: SocketAddr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zone: Option<String>,
}

impl Endpoint {
    /// Creates a new endpoint from a socket address.
    #[must_use]
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            zone: None,
        }
    }

    /// Returns the IPv6 zone, if the endpoint was scoped.
    #[must_use]
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Returns the socket address.
    #[must_use]
    pub fn address(&self) -> &SocketAddr {
        &self.address
    }

    /// Returns the IP address.
    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.address.ip()
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.address.port()
    }
}

impl FromStr for Endpoint {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |e: &dyn fmt::Display| QueryError::InvalidEndpoint(format!("{s}: {e}"));

        let (text, zone) = match split_zone(s) {
            Some((unscoped, zone)) => (unscoped, Some(zone.to_string())),
            None => (s.to_string(), None),
        };
        let mut address = text.parse::<SocketAddr>().map_err(|e| invalid(&e))?;

        if let Some(zone) = &zone {
            let SocketAddr::V6(v6) = &mut address else {
                return Err(invalid(&"zone on a non-IPv6 address"));
            };
            if let Ok(scope_id) = zone.parse::<u32>() {
                v6.set_scope_id(scope_id);
            }
        }
        Ok(Self { address, zone })
    }
}

/// Splits `[addr%zone]:port` into `[addr]:port` and `zone`.
fn split_zone(s: &str) -> Option<(String, &str)> {
    let inner = s.strip_prefix('[')?;
    let (host, port) = inner.split_once("]:")?;
    let (ip, zone) = host.split_once('%')?;
    if zone.is_empty() {
        return None;
    }
    Some((format!("[{ip}]:{port}"), zone))
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.address, &self.zone) {
            (SocketAddr::V6(v6), Some(zone)) => write!(f, "[{}%{zone}]:{}", v6.ip(), v6.port()),
            (address, _) => write!(f, "{address}"),
        }
    }
}

/// Administrative state of a network interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperState {
    /// Interface is up.
    Up,
    /// Interface is down.
    Down,
    /// State could not be determined.
    #[default]
    Unknown,
}

impl fmt::Display for OperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Point-in-time status of a `WireGuard` peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSnapshot {
    public_key: PublicKey,
    has_preshared_key: bool,
    endpoint: Option<Endpoint>,
    allowed_ips: BTreeSet<AllowedIp>,
    last_handshake: Option<u64>,
    rx_bytes: u64,
    tx_bytes: u64,
    persistent_keepalive: Option<u16>,
}

impl PeerSnapshot {
    /// Starts building a peer snapshot for the given key.
    #[must_use]
    pub fn builder(public_key: PublicKey) -> PeerSnapshotBuilder {
        PeerSnapshotBuilder {
            peer: Self {
                public_key,
                has_preshared_key: false,
                endpoint: None,
                allowed_ips: BTreeSet::new(),
                last_handshake: None,
                rx_bytes: 0,
                tx_bytes: 0,
                persistent_keepalive: None,
            },
        }
    }

    /// The peer's public key.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Whether a preshared key is configured.
    #[must_use]
    pub fn has_preshared_key(&self) -> bool {
        self.has_preshared_key
    }

    /// Current endpoint, if known.
    #[must_use]
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Allowed IP ranges, in network order.
    #[must_use]
    pub fn allowed_ips(&self) -> &BTreeSet<AllowedIp> {
        &self.allowed_ips
    }

    /// Unix timestamp of the last successful handshake.
    #[must_use]
    pub fn last_handshake(&self) -> Option<u64> {
        self.last_handshake
    }

    /// Bytes received from this peer.
    #[must_use]
    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes
    }

    /// Bytes transmitted to this peer.
    #[must_use]
    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes
    }

    /// Persistent keepalive interval in seconds.
    #[must_use]
    pub fn persistent_keepalive(&self) -> Option<u16> {
        self.persistent_keepalive
    }
}

/// Builder for [`PeerSnapshot`]; the snapshot is frozen by [`build`](Self::build).
#[derive(Debug)]
pub struct PeerSnapshotBuilder {
    peer: PeerSnapshot,
}

impl PeerSnapshotBuilder {
    /// Marks the peer as using a preshared key.
    #[must_use]
    pub fn preshared_key(mut self, present: bool) -> Self {
        self.peer.has_preshared_key = present;
        self
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: Option<Endpoint>) -> Self {
        self.peer.endpoint = endpoint;
        self
    }

    /// Adds an allowed IP.
    #[must_use]
    pub fn allowed_ip(mut self, ip: AllowedIp) -> Self {
        self.peer.allowed_ips.insert(ip);
        self
    }

    /// Sets the last handshake timestamp. Zero means no handshake.
    #[must_use]
    pub fn last_handshake(mut self, unix_secs: Option<u64>) -> Self {
        self.peer.last_handshake = unix_secs.filter(|&t| t > 0);
        self
    }

    /// Sets the transfer counters.
    #[must_use]
    pub fn transfer(mut self, rx_bytes: u64, tx_bytes: u64) -> Self {
        self.peer.rx_bytes = rx_bytes;
        self.peer.tx_bytes = tx_bytes;
        self
    }

    /// Sets the persistent keepalive interval.
    #[must_use]
    pub fn persistent_keepalive(mut self, seconds: Option<u16>) -> Self {
        self.peer.persistent_keepalive = seconds.filter(|&s| s > 0);
        self
    }

    /// Finishes the snapshot.
    #[must_use]
    pub fn build(self) -> PeerSnapshot {
        self.peer
    }
}

/// Point-in-time status of a `WireGuard` interface and its peers.
///
/// Deserialization goes through the builder, so duplicate peers are
/// rejected there too.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterfaceSnapshot")]
pub struct InterfaceSnapshot {
    name: String,
    public_key: Option<PublicKey>,
    listen_port: Option<u16>,
    fwmark: Option<u32>,
    mtu: Option<u32>,
    state: OperState,
    peers: Vec<PeerSnapshot>,
}

impl InterfaceSnapshot {
    /// Starts building an interface snapshot.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> InterfaceSnapshotBuilder {
        InterfaceSnapshotBuilder {
            iface: Self {
                name: name.into(),
                public_key: None,
                listen_port: None,
                fwmark: None,
                mtu: None,
                state: OperState::Unknown,
                peers: Vec::new(),
            },
        }
    }

    /// Interface name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interface public key, absent when no private key is configured.
    #[must_use]
    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    /// Listen port.
    #[must_use]
    pub fn listen_port(&self) -> Option<u16> {
        self.listen_port
    }

    /// Firewall mark.
    #[must_use]
    pub fn fwmark(&self) -> Option<u32> {
        self.fwmark
    }

    /// Link MTU.
    #[must_use]
    pub fn mtu(&self) -> Option<u32> {
        self.mtu
    }

    /// Administrative state.
    #[must_use]
    pub fn state(&self) -> OperState {
        self.state
    }

    /// Peers in the order the control interface reported them.
    #[must_use]
    pub fn peers(&self) -> &[PeerSnapshot] {
        &self.peers
    }
}

#[derive(Deserialize)]
struct RawInterfaceSnapshot {
    name: String,
    public_key: Option<PublicKey>,
    listen_port: Option<u16>,
    fwmark: Option<u32>,
    mtu: Option<u32>,
    #[serde(default)]
    state: OperState,
    #[serde(default)]
    peers: Vec<PeerSnapshot>,
}

impl TryFrom<RawInterfaceSnapshot> for InterfaceSnapshot {
    type Error = QueryError;

    fn try_from(raw: RawInterfaceSnapshot) -> Result<Self> {
        let mut builder = Self::builder(raw.name)
            .public_key(raw.public_key)
            .listen_port(raw.listen_port)
            .fwmark(raw.fwmark)
            .mtu(raw.mtu)
            .state(raw.state);
        for peer in raw.peers {
            builder.push_peer(peer)?;
        }
        Ok(builder.build())
    }
}

/// Builder for [`InterfaceSnapshot`].
///
/// Peer keys must be unique per interface; [`peer`](Self::peer) rejects a
/// repeated key.
#[derive(Debug)]
pub struct InterfaceSnapshotBuilder {
    iface: InterfaceSnapshot,
}

impl InterfaceSnapshotBuilder {
    /// Sets the interface public key.
    #[must_use]
    pub fn public_key(mut self, key: Option<PublicKey>) -> Self {
        self.iface.public_key = key;
        self
    }

    /// Sets the listen port. Zero means unset.
    #[must_use]
    pub fn listen_port(mut self, port: Option<u16>) -> Self {
        self.iface.listen_port = port.filter(|&p| p > 0);
        self
    }

    /// Sets the firewall mark. Zero means unset.
    #[must_use]
    pub fn fwmark(mut self, mark: Option<u32>) -> Self {
        self.iface.fwmark = mark.filter(|&m| m > 0);
        self
    }

    /// Sets the link MTU.
    #[must_use]
    pub fn mtu(mut self, mtu: Option<u32>) -> Self {
        self.iface.mtu = mtu;
        self
    }

    /// Sets the administrative state.
    #[must_use]
    pub fn state(mut self, state: OperState) -> Self {
        self.iface.state = state;
        self
    }

    /// Adds a peer.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::DuplicatePeer`] if a peer with the same key exists.
    pub fn peer(mut self, peer: PeerSnapshot) -> Result<Self> {
        self.push_peer(peer)?;
        Ok(self)
    }

    /// Adds a peer in place.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::DuplicatePeer`] if a peer with the same key exists.
    pub fn push_peer(&mut self, peer: PeerSnapshot) -> Result<()> {
        if self
            .iface
            .peers
            .iter()
            .any(|p| p.public_key == peer.public_key)
        {
            return Err(QueryError::duplicate_peer(
                &self.iface.name,
                peer.public_key.to_base64(),
            ));
        }
        self.iface.peers.push(peer);
        Ok(())
    }

    /// Interface name being built.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.iface.name
    }

    /// Finishes the snapshot.
    #[must_use]
    pub fn build(self) -> InterfaceSnapshot {
        self.iface
    }
}

/// Version information for the `WireGuard` implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Version of the userspace tools or daemon (e.g. `v1.0.20210914`).
    pub version: String,
    /// Whether the kernel module is loaded.
    pub module_loaded: bool,
    /// Version exported by the kernel module, if any.
    pub module_version: Option<String>,
}

impl VersionInfo {
    /// Creates version information.
    #[must_use]
    pub fn new(version: impl Into<String>, module_loaded: bool) -> Self {
        Self {
            version: version.into(),
            module_loaded,
            module_version: None,
        }
    }

    /// Sets the kernel module version.
    #[must_use]
    pub fn with_module_version(mut self, version: Option<String>) -> Self {
        self.module_version = version;
        self
    }
}
