//! Conversion of raw snapshots into a stable, serializable view.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keys::PublicKey;
use crate::types::{AllowedIp, Endpoint, InterfaceSnapshot, OperState, PeerSnapshot};

/// Latest handshake of a peer, with "never" made explicit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handshake {
    /// The peer has never completed a handshake.
    Never,
    /// Unix timestamp of the latest handshake.
    At(u64),
}

impl From<Option<u64>> for Handshake {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(t) if t > 0 => Self::At(t),
            _ => Self::Never,
        }
    }
}

impl fmt::Display for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("(never)"),
            Self::At(t) => match i64::try_from(*t)
                .ok()
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
                None => write!(f, "@{t}"),
            },
        }
    }
}

/// Normalized peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerView {
    /// The peer's public key.
    pub public_key: PublicKey,
    /// Whether a preshared key is configured.
    pub preshared_key: bool,
    /// Current endpoint, if known.
    pub endpoint: Option<Endpoint>,
    /// Allowed IP ranges in network order.
    pub allowed_ips: Vec<AllowedIp>,
    /// Latest handshake.
    pub latest_handshake: Handshake,
    /// Bytes received from this peer.
    pub rx_bytes: u64,
    /// Bytes transmitted to this peer.
    pub tx_bytes: u64,
    /// Persistent keepalive interval in seconds.
    pub persistent_keepalive: Option<u16>,
}

/// Normalized interface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceView {
    /// Interface name.
    pub name: String,
    /// Interface public key.
    pub public_key: Option<PublicKey>,
    /// Listen port.
    pub listen_port: Option<u16>,
    /// Firewall mark.
    pub fwmark: Option<u32>,
    /// Link MTU.
    pub mtu: Option<u32>,
    /// Administrative state.
    pub state: OperState,
    /// Peers sorted by public key.
    pub peers: Vec<PeerView>,
    /// Sum of `rx_bytes` over all peers.
    pub rx_total: u64,
    /// Sum of `tx_bytes` over all peers.
    pub tx_total: u64,
}

/// Normalized status of every interface, sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    /// Interfaces sorted by name.
    pub interfaces: Vec<InterfaceView>,
}

impl StatusView {
    /// Whether no interfaces were reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Total number of peers across all interfaces.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.interfaces.iter().map(|i| i.peers.len()).sum()
    }
}

/// Sorts interfaces by name and peers by public key.
///
/// The sort is stable, so repeated calls on identical input yield identical
/// output.
#[must_use]
pub fn normalize(interfaces: Vec<InterfaceSnapshot>) -> StatusView {
    let mut views: Vec<InterfaceView> = interfaces.iter().map(interface_view).collect();
    views.sort_by(|a, b| a.name.cmp(&b.name));
    StatusView { interfaces: views }
}

fn interface_view(iface: &InterfaceSnapshot) -> InterfaceView {
    let mut peers: Vec<PeerView> = iface.peers().iter().map(peer_view).collect();
    peers.sort_by(|a, b| a.public_key.cmp(&b.public_key));

    let rx_total = peers.iter().fold(0u64, |acc, p| acc.saturating_add(p.rx_bytes));
    let tx_total = peers.iter().fold(0u64, |acc, p| acc.saturating_add(p.tx_bytes));

    InterfaceView {
        name: iface.name().to_string(),
        public_key: iface.public_key().copied(),
        listen_port: iface.listen_port(),
        fwmark: iface.fwmark(),
        mtu: iface.mtu(),
        state: iface.state(),
        peers,
        rx_total,
        tx_total,
    }
}

fn peer_view(peer: &PeerSnapshot) -> PeerView {
    PeerView {
        public_key: *peer.public_key(),
        preshared_key: peer.has_preshared_key(),
        endpoint: peer.endpoint().cloned(),
        allowed_ips: peer.allowed_ips().iter().cloned().collect(),
        latest_handshake: Handshake::from(peer.last_handshake()),
        rx_bytes: peer.rx_bytes(),
        tx_bytes: peer.tx_bytes(),
        persistent_keepalive: peer.persistent_keepalive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_SIZE;
    use proptest::prelude::*;

    fn key(byte: u8) -> PublicKey {
        PublicKey::from_bytes_array([byte; KEY_SIZE])
    }

    fn iface(name: &str, peer_bytes: &[u8]) -> InterfaceSnapshot {
        let mut builder = InterfaceSnapshot::builder(name);
        for &b in peer_bytes {
            builder
                .push_peer(PeerSnapshot::builder(key(b)).transfer(u64::from(b), 1).build())
                .expect("unique peer");
        }
        builder.build()
    }

    #[test]
    fn sorts_interfaces_and_peers() {
        let view = normalize(vec![iface("wg1", &[3, 1]), iface("wg0", &[9, 2, 5])]);

        let names: Vec<_> = view.interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["wg0", "wg1"]);

        let wg0_keys: Vec<_> = view.interfaces[0].peers.iter().map(|p| p.public_key).collect();
        assert_eq!(wg0_keys, [key(2), key(5), key(9)]);
    }

    #[test]
    fn absent_handshake_becomes_never() {
        let view = normalize(vec![iface("wg0", &[1])]);
        assert_eq!(view.interfaces[0].peers[0].latest_handshake, Handshake::Never);
    }

    #[test]
    fn totals_are_summed() {
        let view = normalize(vec![iface("wg0", &[1, 2, 3])]);
        assert_eq!(view.interfaces[0].rx_total, 6);
        assert_eq!(view.interfaces[0].tx_total, 3);
        assert_eq!(view.peer_count(), 3);
    }

    #[test]
    fn empty_input_is_empty_view() {
        let view = normalize(Vec::new());
        assert!(view.is_empty());
        assert_eq!(view.peer_count(), 0);
    }

    #[test]
    fn handshake_display() {
        assert_eq!(Handshake::Never.to_string(), "(never)");
        assert_eq!(Handshake::At(1_700_000_000).to_string(), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn handshake_display_out_of_range() {
        assert_eq!(Handshake::At(u64::MAX).to_string(), format!("@{}", u64::MAX));
        let past_i64 = i64::MAX as u64 + 1;
        assert_eq!(Handshake::At(past_i64).to_string(), format!("@{past_i64}"));
    }

    #[test]
    fn handshake_serializes_with_explicit_never() {
        let json = serde_json::to_string(&Handshake::Never).expect("serialize");
        assert_eq!(json, "\"never\"");
        let json = serde_json::to_string(&Handshake::At(5)).expect("serialize");
        assert_eq!(json, r#"{"at":5}"#);
    }

    proptest! {
        #[test]
        fn ordering_is_independent_of_input_order(
            names in prop::collection::btree_set("wg[0-9]{1,2}", 0..6),
            peers in prop::collection::btree_set(any::<u8>(), 0..12),
            seed in any::<u64>(),
        ) {
            let peers: Vec<u8> = peers.into_iter().collect();
            let reversed: Vec<u8> = peers.iter().rev().copied().collect();
            let build = |order: &[String], peer_order: &[u8]| -> Vec<InterfaceSnapshot> {
                order.iter().map(|n| iface(n, peer_order)).collect()
            };

            let forward: Vec<String> = names.iter().cloned().collect();
            let mut shuffled = forward.clone();
            let len = shuffled.len();
            if len > 1 {
                shuffled.rotate_left((seed as usize) % len);
            }

            let a = normalize(build(&forward, &peers));
            let b = normalize(build(&shuffled, &reversed));
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a, normalize(build(&forward, &peers)));
        }
    }
}
