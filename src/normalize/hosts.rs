//! Extra-hosts expansion.
//!
//! A key may name several hosts separated by whitespace; each host gets its
//! own entry. The same expansion feeds both `HostConfig.ExtraHosts` and the
//! `/etc/hosts` lines expected inside the container.

use crate::normalize::{NormalizeError, Result};
use indexmap::IndexMap;
use std::net::IpAddr;

/// Engine keyword resolving to the host's gateway address.
pub const HOST_GATEWAY: &str = "host-gateway";

/// Hostname(s) to IP, in the caller's order.
pub type ExtraHostsSpec = IndexMap<String, String>;

/// Expanded `(host, ip)` pairs in emission order.
fn expand_pairs(spec: &ExtraHostsSpec) -> Result<Vec<(&str, &str)>> {
    let mut pairs = Vec::new();

    for (hosts, ip) in spec {
        let ip = ip.trim();
        if ip != HOST_GATEWAY && ip.parse::<IpAddr>().is_err() {
            return Err(NormalizeError::MalformedSpec(format!(
                "extra host {:?} maps to an invalid ip {:?}",
                hosts, ip
            )));
        }

        let before = pairs.len();
        for host in hosts.split_whitespace() {
            // The engine splits wire entries at the first ':'.
            if host.contains(':') {
                return Err(NormalizeError::MalformedSpec(format!(
                    "extra host name {:?} contains ':'",
                    host
                )));
            }
            pairs.push((host, ip));
        }
        if pairs.len() == before {
            return Err(NormalizeError::MalformedSpec(format!(
                "extra host entry for {} has no hostname",
                ip
            )));
        }
    }

    Ok(pairs)
}

/// Wire entries for `HostConfig.ExtraHosts`, `"host:ip"`.
///
/// ```rust
/// use podnorm::normalize::{ExtraHostsSpec, expand_extra_hosts};
///
/// let mut spec = ExtraHostsSpec::new();
/// spec.insert("host1 host3".to_string(), "127.0.0.2".to_string());
/// spec.insert("host2".to_string(), "127.0.0.3".to_string());
///
/// assert_eq!(
///     expand_extra_hosts(&spec).unwrap(),
///     vec!["host1:127.0.0.2", "host3:127.0.0.2", "host2:127.0.0.3"]
/// );
/// ```
pub fn expand_extra_hosts(spec: &ExtraHostsSpec) -> Result<Vec<String>> {
    Ok(expand_pairs(spec)?
        .into_iter()
        .map(|(host, ip)| format!("{}:{}", host, ip))
        .collect())
}

/// Lines expected in the container's `/etc/hosts`, `"ip\thost"`.
pub fn expected_hosts_file_lines(spec: &ExtraHostsSpec) -> Result<Vec<String>> {
    Ok(expand_pairs(spec)?
        .into_iter()
        .map(|(host, ip)| format!("{}\t{}", ip, host))
        .collect())
}
