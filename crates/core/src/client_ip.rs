//! Client IP resolution from request headers.

use std::net::IpAddr;

/// Stored when no candidate address is a valid IP.
pub const UNKNOWN_IP: &str = "0.0.0.0";

/// Resolves the client IP.
///
/// Precedence: `Client-IP` header, first `X-Forwarded-For` entry, socket
/// remote address. Candidates that do not parse as an IP are skipped.
pub fn resolve_client_ip(
    client_ip: Option<&str>,
    forwarded_for: Option<&str>,
    remote_addr: Option<IpAddr>,
) -> String {
    let forwarded_first = forwarded_for.and_then(|xff| xff.split(',').next());

    [client_ip, forwarded_first]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .find_map(|s| s.parse::<IpAddr>().ok())
        .or(remote_addr)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}
