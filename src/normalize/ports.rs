//! Port binding expansion.
//!
//! A container port (`"97/tcp"`, `"2/udp"`, `"8080"`) maps to one of three
//! host-side shapes: a bare host port, an `(ip, port)` pair, or an ordered
//! list mixing both. The shape is resolved once here into an ordered list of
//! engine [`PortBinding`]s; nothing downstream inspects the original shape.

use crate::normalize::{NormalizeError, Result};
use bollard::models::PortBinding;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Protocol assumed when a container port has none.
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// One host-side binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPortEntry {
    /// Host port on all interfaces
    Port(String),
    /// Host port on a specific address
    WithIp(String, String),
}

/// Host side of a port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPortSpec", into = "RawPortSpec")]
pub enum PortSpec {
    HostPortSingle(String),
    HostPortWithIp(String, String),
    /// The only shape that yields several bindings for one container port
    HostPortList(Vec<HostPortEntry>),
}

impl From<&str> for PortSpec {
    fn from(port: &str) -> Self {
        PortSpec::HostPortSingle(port.to_string())
    }
}

impl From<(&str, &str)> for PortSpec {
    fn from((ip, port): (&str, &str)) -> Self {
        PortSpec::HostPortWithIp(ip.to_string(), port.to_string())
    }
}

impl From<Vec<HostPortEntry>> for PortSpec {
    fn from(entries: Vec<HostPortEntry>) -> Self {
        PortSpec::HostPortList(entries)
    }
}

/// Container port to host spec, in the caller's order.
pub type PortMap = IndexMap<String, PortSpec>;

/// Engine `HostConfig.PortBindings` shape.
pub type PortBindings = HashMap<String, Option<Vec<PortBinding>>>;

/// Normalize `"<port>[/<protocol>]"` to `"<port>/<protocol>"`.
///
/// # Errors
///
/// [`NormalizeError::MalformedSpec`] for a missing or non-numeric port or
/// extra `/` separators, [`NormalizeError::InvalidOption`] for protocols
/// other than tcp and udp.
pub fn normalize_container_port(container_port: &str) -> Result<String> {
    let (port, protocol) = match container_port.split_once('/') {
        Some((port, protocol)) => (port, protocol),
        None => (container_port, DEFAULT_PROTOCOL),
    };

    if protocol.contains('/') {
        return Err(NormalizeError::MalformedSpec(format!(
            "container port has too many '/' separators: {}",
            container_port
        )));
    }
    parse_port(port).map_err(|_| {
        NormalizeError::MalformedSpec(format!("invalid container port: {:?}", container_port))
    })?;

    match protocol {
        "tcp" | "udp" => Ok(format!("{}/{}", port, protocol)),
        other => Err(NormalizeError::InvalidOption(format!(
            "unsupported protocol {:?} in {}",
            other, container_port
        ))),
    }
}

/// Expand one container port into its ordered host bindings.
///
/// Returns the normalized container port together with the bindings.
pub fn expand_ports(container_port: &str, spec: &PortSpec) -> Result<(String, Vec<PortBinding>)> {
    let key = normalize_container_port(container_port)?;

    let bindings = match spec {
        PortSpec::HostPortSingle(port) => vec![binding("", port)?],
        PortSpec::HostPortWithIp(ip, port) => vec![binding(ip, port)?],
        PortSpec::HostPortList(entries) => entries
            .iter()
            .map(|entry| match entry {
                HostPortEntry::Port(port) => binding("", port),
                HostPortEntry::WithIp(ip, port) => binding(ip, port),
            })
            .collect::<Result<Vec<_>>>()?,
    };

    Ok((key, bindings))
}

/// Expand a whole port map into `HostConfig.PortBindings`.
///
/// # Errors
///
/// Besides the per-port errors, two keys that normalize to the same
/// port/protocol (for example `"80"` and `"80/tcp"`) are rejected with
/// [`NormalizeError::InvalidOption`].
pub fn expand_port_map(ports: &PortMap) -> Result<PortBindings> {
    let mut expanded = PortBindings::with_capacity(ports.len());

    for (container_port, spec) in ports {
        let (key, bindings) = expand_ports(container_port, spec)?;
        if expanded.contains_key(&key) {
            return Err(NormalizeError::InvalidOption(format!(
                "container port {} is specified more than once",
                key
            )));
        }
        expanded.insert(key, Some(bindings));
    }

    Ok(expanded)
}

fn binding(ip: &str, port: &str) -> Result<PortBinding> {
    if !ip.is_empty() && ip.parse::<IpAddr>().is_err() {
        return Err(NormalizeError::MalformedSpec(format!(
            "invalid host ip: {:?}",
            ip
        )));
    }
    parse_port(port)
        .map_err(|_| NormalizeError::MalformedSpec(format!("invalid host port: {:?}", port)))?;

    Ok(PortBinding {
        host_ip: Some(ip.to_string()),
        host_port: Some(port.to_string()),
    })
}

fn parse_port(port: &str) -> std::result::Result<u16, ()> {
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(()),
        Ok(port) => Ok(port),
    }
}

// File representation: a string or number is a bare port, a table
// `{ ip, port }` is an address-bound port, an array is a list of either.

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPort {
    Number(u16),
    Text(String),
}

impl From<RawPort> for String {
    fn from(raw: RawPort) -> Self {
        match raw {
            RawPort::Number(port) => port.to_string(),
            RawPort::Text(port) => port,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Bound { ip: String, port: RawPort },
    Port(RawPort),
}

impl From<RawEntry> for HostPortEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Bound { ip, port } => HostPortEntry::WithIp(ip, port.into()),
            RawEntry::Port(port) => HostPortEntry::Port(port.into()),
        }
    }
}

impl From<HostPortEntry> for RawEntry {
    fn from(entry: HostPortEntry) -> Self {
        match entry {
            HostPortEntry::Port(port) => RawEntry::Port(RawPort::Text(port)),
            HostPortEntry::WithIp(ip, port) => RawEntry::Bound {
                ip,
                port: RawPort::Text(port),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPortSpec {
    List(Vec<RawEntry>),
    One(RawEntry),
}

impl From<RawPortSpec> for PortSpec {
    fn from(raw: RawPortSpec) -> Self {
        match raw {
            RawPortSpec::List(entries) => {
                PortSpec::HostPortList(entries.into_iter().map(HostPortEntry::from).collect())
            }
            RawPortSpec::One(entry) => match HostPortEntry::from(entry) {
                HostPortEntry::Port(port) => PortSpec::HostPortSingle(port),
                HostPortEntry::WithIp(ip, port) => PortSpec::HostPortWithIp(ip, port),
            },
        }
    }
}

impl From<PortSpec> for RawPortSpec {
    fn from(spec: PortSpec) -> Self {
        match spec {
            PortSpec::HostPortSingle(port) => RawPortSpec::One(HostPortEntry::Port(port).into()),
            PortSpec::HostPortWithIp(ip, port) => {
                RawPortSpec::One(HostPortEntry::WithIp(ip, port).into())
            }
            PortSpec::HostPortList(entries) => {
                RawPortSpec::List(entries.into_iter().map(RawEntry::from).collect())
            }
        }
    }
}
