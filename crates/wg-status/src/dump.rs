//! Parser for `wg show all dump` output.
//!
//! The dump is tab separated, one line per interface followed by one line
//! per peer of that interface:
//!
//! ```text
//! <ifname> <private-key> <public-key> <listen-port> <fwmark>
//! <ifname> <public-key> <preshared-key> <endpoint> <allowed-ips> <latest-handshake> <rx> <tx> <keepalive>
//! ```
//!
//! Keys, endpoint and allowed-ips use `(none)` for absent values, fwmark and
//! keepalive use `off`, a zero handshake means the peer never completed one.

use std::str::FromStr;

use crate::error::{QueryError, Result};
use crate::keys::PublicKey;
use crate::types::{AllowedIp, Endpoint, InterfaceSnapshotBuilder, PeerSnapshot};

const NONE: &str = "(none)";
const OFF: &str = "off";

const INTERFACE_FIELDS: usize = 5;
const PEER_FIELDS: usize = 9;

/// Parses a full dump into interface builders, in input order.
///
/// Builders are returned rather than finished snapshots so the caller can
/// attach link attributes (state, MTU) that the dump does not carry.
///
/// # Errors
///
/// Returns [`QueryError::Parse`] for malformed lines and
/// [`QueryError::DuplicatePeer`] if an interface lists the same peer twice.
pub fn parse_dump(input: &str) -> Result<Vec<InterfaceSnapshotBuilder>> {
    let mut interfaces: Vec<InterfaceSnapshotBuilder> = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        match fields.len() {
            INTERFACE_FIELDS => {
                let iface = parse_interface(&fields, line_no)?;
                if interfaces.iter().any(|b| b.name() == fields[0]) {
                    return Err(QueryError::parse(
                        line_no,
                        format!("interface {} listed twice", fields[0]),
                    ));
                }
                interfaces.push(iface);
            }
            PEER_FIELDS => {
                let peer = parse_peer(&fields, line_no)?;
                let owner = interfaces
                    .last_mut()
                    .filter(|b| b.name() == fields[0])
                    .ok_or_else(|| {
                        QueryError::parse(
                            line_no,
                            format!("peer line for {} precedes its interface line", fields[0]),
                        )
                    })?;
                owner.push_peer(peer)?;
            }
            n => {
                return Err(QueryError::parse(
                    line_no,
                    format!("expected {INTERFACE_FIELDS} or {PEER_FIELDS} fields, got {n}"),
                ));
            }
        }
    }

    Ok(interfaces)
}

fn parse_interface(fields: &[&str], line: usize) -> Result<InterfaceSnapshotBuilder> {
    let name = fields[0];
    if name.is_empty() {
        return Err(QueryError::parse(line, "empty interface name"));
    }
    // fields[1] is the private key; it is never retained.
    let public_key = optional(fields[2], NONE)
        .map(|s| parse_field::<PublicKey>(s, "public key", line))
        .transpose()?;
    let listen_port = parse_field::<u16>(fields[3], "listen port", line)?;
    let fwmark = optional(fields[4], OFF)
        .map(parse_fwmark)
        .transpose()
        .map_err(|e| QueryError::parse(line, format!("invalid fwmark: {e}")))?;

    Ok(crate::types::InterfaceSnapshot::builder(name)
        .public_key(public_key)
        .listen_port(Some(listen_port))
        .fwmark(fwmark))
}

fn parse_peer(fields: &[&str], line: usize) -> Result<PeerSnapshot> {
    let public_key = parse_field::<PublicKey>(fields[1], "peer public key", line)?;
    let has_psk = fields[2] != NONE;
    let endpoint = optional(fields[3], NONE)
        .map(|s| parse_field::<Endpoint>(s, "endpoint", line))
        .transpose()?;
    let handshake = parse_field::<u64>(fields[5], "latest handshake", line)?;
    let rx = parse_field::<u64>(fields[6], "rx bytes", line)?;
    let tx = parse_field::<u64>(fields[7], "tx bytes", line)?;
    let keepalive = optional(fields[8], OFF)
        .map(|s| parse_field::<u16>(s, "persistent keepalive", line))
        .transpose()?;

    let mut builder = PeerSnapshot::builder(public_key)
        .preshared_key(has_psk)
        .endpoint(endpoint)
        .last_handshake(Some(handshake))
        .transfer(rx, tx)
        .persistent_keepalive(keepalive);

    if let Some(list) = optional(fields[4], NONE) {
        for cidr in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            builder = builder.allowed_ip(parse_field::<AllowedIp>(cidr, "allowed ip", line)?);
        }
    }

    Ok(builder.build())
}

fn optional<'a>(value: &'a str, sentinel: &str) -> Option<&'a str> {
    if value == sentinel || value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_field<T>(value: &str, what: &str, line: usize) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| QueryError::parse(line, format!("invalid {what} {value:?}: {e}")))
}

fn parse_fwmark(value: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    match value.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    }
}
