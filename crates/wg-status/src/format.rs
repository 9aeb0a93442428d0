//! Plain-text rendering of the four status panels.
//!
//! Every function here is pure and infallible. Missing data renders as an
//! explicit placeholder, so no panel is ever empty.

use crate::normalize::{InterfaceView, PeerView, StatusView};
use crate::types::VersionInfo;

/// Rendered when no WireGuard interfaces exist.
pub const NO_INTERFACES: &str = "No WireGuard interfaces found.";

/// Rendered in place of a panel whose query failed.
pub const UNAVAILABLE: &str = "Status unavailable.";

/// Rendered in place of an absent value.
pub const NONE: &str = "(none)";

const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

/// Renders the "Connection Status" panel: interfaces with their peers.
///
/// Interfaces without peers produce no peer section at all.
#[must_use]
pub fn connection_status(view: &StatusView) -> String {
    if view.is_empty() {
        return NO_INTERFACES.to_string();
    }
    view.interfaces
        .iter()
        .map(interface_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn interface_block(iface: &InterfaceView) -> String {
    let mut lines = vec![
        format!("interface: {}", iface.name),
        format!(
            "  public key: {}",
            iface
                .public_key
                .map_or_else(|| NONE.to_string(), |k| k.to_base64())
        ),
        format!(
            "  listening port: {}",
            iface
                .listen_port
                .map_or_else(|| NONE.to_string(), |p| p.to_string())
        ),
    ];
    if let Some(mark) = iface.fwmark {
        lines.push(format!("  fwmark: {mark:#x}"));
    }

    let mut blocks = vec![lines.join("\n")];
    blocks.extend(iface.peers.iter().map(peer_block));
    blocks.join("\n\n")
}

fn peer_block(peer: &PeerView) -> String {
    let allowed = if peer.allowed_ips.is_empty() {
        NONE.to_string()
    } else {
        peer.allowed_ips
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut lines = vec![format!("peer: {}", peer.public_key)];
    if peer.preshared_key {
        lines.push("  preshared key: (hidden)".to_string());
    }
    lines.push(format!(
        "  endpoint: {}",
        peer.endpoint
            .as_ref()
            .map_or_else(|| NONE.to_string(), ToString::to_string)
    ));
    lines.push(format!("  allowed ips: {allowed}"));
    lines.push(format!("  latest handshake: {}", peer.latest_handshake));
    lines.push(format!(
        "  transfer: {} received, {} sent",
        human_bytes(peer.rx_bytes),
        human_bytes(peer.tx_bytes)
    ));
    if let Some(secs) = peer.persistent_keepalive {
        lines.push(format!("  persistent keepalive: every {secs} seconds"));
    }
    lines.join("\n")
}

/// Renders the "Interface Status" panel: one row per interface.
#[must_use]
pub fn interface_status(view: &StatusView) -> String {
    if view.is_empty() {
        return NO_INTERFACES.to_string();
    }

    let name_width = view
        .interfaces
        .iter()
        .map(|i| i.name.len())
        .max()
        .unwrap_or(0)
        .max("INTERFACE".len());

    let header = format!(
        "{:<name_width$}  {:<7}  {:>5}  {:>5}  {:>5}  {:>12}  {:>12}",
        "INTERFACE", "STATE", "MTU", "PORT", "PEERS", "RECEIVED", "SENT"
    );
    let mut lines = vec![header.clone(), "─".repeat(header.chars().count())];

    for iface in &view.interfaces {
        lines.push(format!(
            "{:<name_width$}  {:<7}  {:>5}  {:>5}  {:>5}  {:>12}  {:>12}",
            iface.name,
            iface.state.to_string(),
            iface.mtu.map_or_else(|| "-".to_string(), |m| m.to_string()),
            iface
                .listen_port
                .map_or_else(|| "-".to_string(), |p| p.to_string()),
            iface.peers.len(),
            human_bytes(iface.rx_total),
            human_bytes(iface.tx_total),
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "Total: {} interface(s), {} peer(s)",
        view.interfaces.len(),
        view.peer_count()
    ));
    lines.join("\n")
}

/// Renders the "WireGuard Version" panel.
#[must_use]
pub fn version_status(info: &VersionInfo) -> String {
    let version = if info.version.trim().is_empty() {
        "(unknown)"
    } else {
        info.version.trim()
    };
    format!(
        "wireguard-tools: {version}\nkernel module:   {}",
        module_summary(info.module_loaded, info.module_version.as_deref())
    )
}

/// Renders the "Kernel Module Status" panel.
#[must_use]
pub fn module_status(loaded: bool, version: Option<&str>) -> String {
    format!(
        "{} kernel module: {}",
        crate::sysfs::MODULE_NAME,
        module_summary(loaded, version)
    )
}

fn module_summary(loaded: bool, version: Option<&str>) -> String {
    match (loaded, version.map(str::trim).filter(|v| !v.is_empty())) {
        (true, Some(v)) => format!("loaded (version {v})"),
        (true, None) => "loaded".to_string(),
        (false, _) => "not loaded".to_string(),
    }
}

/// Formats a byte count with binary units, as `wg show` does.
#[must_use]
pub fn human_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{PublicKey, KEY_SIZE};
    use crate::normalize::{normalize, Handshake};
    use crate::types::{AllowedIp, InterfaceSnapshot, OperState, PeerSnapshot};
    use test_case::test_case;

    fn key(byte: u8) -> PublicKey {
        PublicKey::from_bytes_array([byte; KEY_SIZE])
    }

    fn wg0_with_one_peer(handshake: Option<u64>) -> StatusView {
        let peer = PeerSnapshot::builder(key(1))
            .endpoint(Some("192.0.2.1:51820".parse().expect("endpoint")))
            .allowed_ip(AllowedIp::from_cidr("10.0.0.2/32").expect("cidr"))
            .last_handshake(handshake)
            .transfer(1536, 42)
            .build();
        let iface = InterfaceSnapshot::builder("wg0")
            .public_key(Some(key(9)))
            .listen_port(Some(51820))
            .mtu(Some(1420))
            .state(OperState::Up)
            .peer(peer)
            .expect("unique peer")
            .build();
        normalize(vec![iface])
    }

    #[test]
    fn empty_view_renders_placeholder() {
        let view = StatusView::default();
        assert_eq!(connection_status(&view), NO_INTERFACES);
        assert_eq!(interface_status(&view), NO_INTERFACES);
    }

    #[test]
    fn peer_without_handshake_shows_never() {
        let text = connection_status(&wg0_with_one_peer(None));
        assert!(text.contains("interface: wg0"));
        assert!(text.contains("  latest handshake: (never)"));
        assert!(text.contains("  endpoint: 192.0.2.1:51820"));
        assert!(text.contains("  allowed ips: 10.0.0.2/32"));
        assert!(text.contains("  transfer: 1.50 KiB received, 42 B sent"));
    }

    #[test]
    fn peer_with_handshake_shows_timestamp() {
        let text = connection_status(&wg0_with_one_peer(Some(1_700_000_000)));
        assert!(text.contains("latest handshake: 2023-11-14 22:13:20 UTC"));
        assert!(!text.contains("(never)"));
    }

    #[test]
    fn interface_without_peers_has_no_peer_section() {
        let iface = InterfaceSnapshot::builder("wg0")
            .listen_port(Some(51820))
            .build();
        let text = connection_status(&normalize(vec![iface]));
        assert!(text.starts_with("interface: wg0"));
        assert!(text.contains("public key: (none)"));
        assert!(!text.contains("peer:"));
        assert!(!text.contains("latest handshake"));
        assert!(!text.contains("transfer"));
    }

    #[test]
    fn preshared_key_is_hidden() {
        let mut view = wg0_with_one_peer(None);
        view.interfaces[0].peers[0].preshared_key = true;
        let text = connection_status(&view);
        assert!(text.contains("preshared key: (hidden)"));
    }

    #[test]
    fn interfaces_are_separated_by_blank_line() {
        let view = normalize(vec![
            InterfaceSnapshot::builder("wg1").build(),
            InterfaceSnapshot::builder("wg0").build(),
        ]);
        let text = connection_status(&view);
        let wg0 = text.find("interface: wg0").expect("wg0");
        let wg1 = text.find("interface: wg1").expect("wg1");
        assert!(wg0 < wg1);
        assert!(text.contains("\n\ninterface: wg1"));
    }

    #[test]
    fn interface_table_has_row_per_interface() {
        let text = interface_status(&wg0_with_one_peer(None));
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].starts_with("INTERFACE"));
        assert!(lines[2].starts_with("wg0"));
        assert!(lines[2].contains("up"));
        assert!(lines[2].contains("1420"));
        assert!(lines[2].contains("51820"));
        assert!(text.ends_with("Total: 1 interface(s), 1 peer(s)"));
    }

    #[test]
    fn interface_table_uses_dash_for_missing_values() {
        let view = normalize(vec![InterfaceSnapshot::builder("wg0").build()]);
        let text = interface_status(&view);
        let row = text.lines().nth(2).expect("row");
        assert!(row.contains("unknown"));
        assert!(row.contains(" - "));
    }

    #[test]
    fn version_panel() {
        let info = VersionInfo::new("v1.0.20210914", true).with_module_version(Some("1.0.0".into()));
        assert_eq!(
            version_status(&info),
            "wireguard-tools: v1.0.20210914\nkernel module:   loaded (version 1.0.0)"
        );
        let info = VersionInfo::new("", false);
        assert_eq!(
            version_status(&info),
            "wireguard-tools: (unknown)\nkernel module:   not loaded"
        );
    }

    #[test_case(true, Some("1.0.0"), "wireguard kernel module: loaded (version 1.0.0)" ; "loaded with version")]
    #[test_case(true, None, "wireguard kernel module: loaded" ; "built in")]
    #[test_case(false, Some("1.0.0"), "wireguard kernel module: not loaded" ; "not loaded")]
    fn module_panel(loaded: bool, version: Option<&str>, expected: &str) {
        assert_eq!(module_status(loaded, version), expected);
    }

    #[test_case(0, "0 B")]
    #[test_case(1023, "1023 B")]
    #[test_case(1024, "1.00 KiB")]
    #[test_case(1_572_864, "1.50 MiB")]
    #[test_case(5 * 1024 * 1024 * 1024, "5.00 GiB")]
    fn human_byte_units(bytes: u64, expected: &str) {
        assert_eq!(human_bytes(bytes), expected);
    }

    #[test]
    fn handshake_sentinel_is_rendered_not_null() {
        let view = wg0_with_one_peer(None);
        assert_eq!(view.interfaces[0].peers[0].latest_handshake, Handshake::Never);
        assert!(!connection_status(&view).contains("null"));
    }
}
