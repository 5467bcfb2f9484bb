//! Peer address handling.
//!
//! Both roles of a Beam session are anchored to a single peer address
//! given on the command line: the listener uses it as its whitelist, the
//! dialer as its target. This module parses that address and implements
//! the whitelist comparison, which matches on IP only — the connecting
//! side's ephemeral port is never part of the decision.

use std::net::{IpAddr, SocketAddr};

use crate::error::{Error, Result};
use crate::DEFAULT_PORT;

/// Parse a host address string into a `SocketAddr`.
///
/// Accepts formats:
/// - `IP` (e.g., `192.168.1.100`) - uses the default port
/// - `IP:PORT` (e.g., `192.168.1.100:4321`) - uses the specified port
/// - `[IPv6]` (e.g., `[::1]`) - uses the default port
/// - `[IPv6]:PORT` (e.g., `[::1]:4321`) - uses the specified port
///
/// # Errors
///
/// Returns an error if the host string cannot be parsed.
pub fn parse_host_address(host: &str) -> Result<SocketAddr> {
    let host = host.trim();

    if let Ok(addr) = host.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if host.starts_with('[') && host.ends_with(']') {
        let ip_str = &host[1..host.len() - 1];
        let ip: IpAddr = ip_str.parse().map_err(|_| bad_host(host))?;
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    if let Some((ip_part, port_part)) = host.rsplit_once(':') {
        if !ip_part.contains(':') {
            let ip: IpAddr = ip_part.parse().map_err(|_| bad_host(host))?;
            let port: u16 = port_part.parse().map_err(|_| {
                Error::InvalidAddress(format!(
                    "invalid port '{port_part}': must be a number between 1 and 65535"
                ))
            })?;
            return Ok(SocketAddr::new(ip, port));
        }
    }

    Err(bad_host(host))
}

fn bad_host(host: &str) -> Error {
    Error::InvalidAddress(format!(
        "invalid host '{host}': use IP or IP:PORT (e.g., 192.168.1.100 or 192.168.1.100:1234)"
    ))
}

/// Whether a connecting peer matches the whitelisted address.
#[must_use]
pub fn peer_is_allowed(peer: SocketAddr, allowed: IpAddr) -> bool {
    peer.ip() == allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_ipv4_only() {
        let addr = parse_host_address("192.168.1.100").unwrap();
        assert_eq!(addr.ip().to_string(), "192.168.1.100");
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_parse_host_ipv4_with_port() {
        let addr = parse_host_address("192.168.1.100:4321").unwrap();
        assert_eq!(addr.ip().to_string(), "192.168.1.100");
        assert_eq!(addr.port(), 4321);
    }

    #[test]
    fn test_parse_host_ipv6_brackets() {
        let addr = parse_host_address("[::1]").unwrap();
        assert_eq!(addr.ip().to_string(), "::1");
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_parse_host_ipv6_with_port() {
        let addr = parse_host_address("[2001:db8::1]:4321").unwrap();
        assert_eq!(addr.ip().to_string(), "2001:db8::1");
        assert_eq!(addr.port(), 4321);
    }

    #[test]
    fn test_parse_host_rejects_garbage() {
        assert!(parse_host_address("not-an-address").is_err());
        assert!(parse_host_address("192.168.1.100:notaport").is_err());
        assert!(parse_host_address("").is_err());
    }

    #[test]
    fn test_peer_matching_ignores_port() {
        let allowed: IpAddr = "192.168.1.7".parse().unwrap();
        assert!(peer_is_allowed("192.168.1.7:59001".parse().unwrap(), allowed));
        assert!(peer_is_allowed("192.168.1.7:33812".parse().unwrap(), allowed));
        assert!(!peer_is_allowed("192.168.1.8:59001".parse().unwrap(), allowed));
    }
}
