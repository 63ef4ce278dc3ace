//! Device fingerprint derivation.
//!
//! A device is identified by `(user_id, user_agent)`. The source IP is
//! recorded alongside but never takes part in identity, since it drifts
//! across a session's lifetime (mobile networks, VPNs, NAT rebinding).

use std::net::{IpAddr, SocketAddr};

/// Placeholder stored when the peer address is not available.
pub const UNKNOWN_IP: &str = "unknown";

/// Request metadata used to resolve or register a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFingerprint {
    /// Raw `User-Agent` header value (empty when absent).
    pub user_agent: String,
    /// Peer IP with any port stripped.
    pub ip: String,
}

impl DeviceFingerprint {
    pub fn new(user_agent: Option<&str>, remote_addr: Option<&str>) -> Self {
        Self {
            user_agent: user_agent.map(str::trim).unwrap_or_default().to_string(),
            ip: remote_addr
                .map(strip_port)
                .unwrap_or_else(|| UNKNOWN_IP.to_string()),
        }
    }
}

/// Strip the port from a peer address, accepting `ip`, `ip:port` and
/// `[v6]:port` forms. Unparseable input is returned trimmed as-is.
pub fn strip_port(addr: &str) -> String {
    let addr = addr.trim();
    if let Ok(socket) = addr.parse::<SocketAddr>() {
        return socket.ip().to_string();
    }
    if let Ok(ip) = addr.parse::<IpAddr>() {
        return ip.to_string();
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => {
            host.to_string()
        }
        _ => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_port_from_v4() {
        assert_eq!(strip_port("1.2.3.4:51234"), "1.2.3.4");
        assert_eq!(strip_port("1.2.3.4"), "1.2.3.4");
    }

    #[test]
    fn strips_port_from_v6() {
        assert_eq!(strip_port("[::1]:8080"), "::1");
        assert_eq!(strip_port("2001:db8::1"), "2001:db8::1");
    }

    #[test]
    fn strips_port_from_hostname() {
        assert_eq!(strip_port("localhost:3000"), "localhost");
    }

    #[test]
    fn missing_metadata_uses_defaults() {
        let fp = DeviceFingerprint::new(None, None);
        assert_eq!(fp.user_agent, "");
        assert_eq!(fp.ip, UNKNOWN_IP);
    }

    #[test]
    fn user_agent_is_trimmed() {
        let fp = DeviceFingerprint::new(Some("  curl/8 "), Some("10.0.0.7:443"));
        assert_eq!(fp.user_agent, "curl/8");
        assert_eq!(fp.ip, "10.0.0.7");
    }
}
