//! Kernel `WireGuard` queries over netlink.
//!
//! Wraps `defguard_wireguard_rs` with the `Kernel` backend. Devices are
//! enumerated from sysfs since netlink has no "list WireGuard links" call.

use std::time::UNIX_EPOCH;

use defguard_wireguard_rs::host::{Host, Peer as DgPeer};
use defguard_wireguard_rs::{Kernel, WGApi, WireguardInterfaceApi};
use tracing::debug;

use crate::config::StatusConfig;
use crate::control::ControlInterface;
use crate::error::{QueryError, Result};
use crate::keys::PublicKey;
use crate::sysfs::Sysfs;
use crate::types::{AllowedIp, Endpoint, InterfaceSnapshot, PeerSnapshot, VersionInfo};

/// Control interface that reads the kernel module directly.
///
/// Requires `CAP_NET_ADMIN`.
#[derive(Debug, Clone, Default)]
pub struct KernelControl {
    sysfs: Sysfs,
}

impl KernelControl {
    /// Creates a kernel control using sysfs at `/`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a kernel control from a status configuration.
    #[must_use]
    pub fn from_config(config: &StatusConfig) -> Self {
        Self {
            sysfs: Sysfs::with_root(&config.sysfs_root),
        }
    }

    /// Uses a different sysfs root.
    #[must_use]
    pub fn with_sysfs(mut self, sysfs: Sysfs) -> Self {
        self.sysfs = sysfs;
        self
    }
}

fn read_host(name: String) -> Result<Host> {
    let api = WGApi::<Kernel>::new(name.clone())
        .map_err(|e| QueryError::unavailable(format!("WGApi::new({name}): {e}")))?;
    api.read_interface_data().map_err(|e| {
        let message = format!("read_interface_data({name}): {e}");
        if message.contains("Operation not permitted") || message.contains("Permission denied") {
            QueryError::permission_denied(message)
        } else {
            QueryError::unavailable(message)
        }
    })
}

fn peer_snapshot(peer: &DgPeer) -> PeerSnapshot {
    let mut builder = PeerSnapshot::builder(PublicKey::from_bytes_array(peer.public_key.as_array()))
        .preshared_key(peer.preshared_key.is_some())
        .endpoint(peer.endpoint.map(Endpoint::new))
        .last_handshake(
            peer.last_handshake
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
        )
        .transfer(peer.rx_bytes, peer.tx_bytes)
        .persistent_keepalive(peer.persistent_keepalive_interval);
    for aip in &peer.allowed_ips {
        match AllowedIp::from_cidr(&aip.to_string()) {
            Ok(ip) => builder = builder.allowed_ip(ip),
            Err(e) => debug!(allowed_ip = %aip, error = %e, "skipping allowed ip"),
        }
    }
    builder.build()
}

impl ControlInterface for KernelControl {
    async fn query_interfaces(&self) -> Result<Vec<InterfaceSnapshot>> {
        let names = self.sysfs.wireguard_links().await?;
        let mut snapshots = Vec::with_capacity(names.len());

        for name in names {
            let host = tokio::task::spawn_blocking({
                let name = name.clone();
                move || read_host(name)
            })
            .await
            .map_err(|e| QueryError::unavailable(format!("netlink task failed: {e}")))??;

            let public_key = host
                .private_key
                .as_ref()
                .map(|k| PublicKey::from_bytes_array(k.public_key().as_array()));
            let mut builder = InterfaceSnapshot::builder(name.as_str())
                .public_key(public_key)
                .listen_port(Some(host.listen_port))
                .state(self.sysfs.link_state(&name).await)
                .mtu(self.sysfs.mtu(&name).await);
            for peer in host.peers.values() {
                builder.push_peer(peer_snapshot(peer))?;
            }
            snapshots.push(builder.build());
        }

        debug!(count = snapshots.len(), "read kernel interfaces");
        Ok(snapshots)
    }

    async fn query_module_state(&self) -> Result<bool> {
        self.sysfs.module_loaded().await
    }

    async fn query_module_version(&self) -> Result<Option<String>> {
        Ok(self.sysfs.module_version().await)
    }

    async fn query_version(&self) -> Result<VersionInfo> {
        let loaded = self.sysfs.module_loaded_or_warn().await;
        let module_version = self.sysfs.module_version().await;
        let version = module_version
            .clone()
            .ok_or_else(|| QueryError::unavailable("kernel module exports no version"))?;
        Ok(VersionInfo::new(version, loaded).with_module_version(module_version))
    }
}
