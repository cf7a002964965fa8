//! Safety gate for remote sources.
//!
//! Decides whether a URL may be fetched at all. Only `http://` and
//! `https://` are accepted. A host that is a literal private, loopback or
//! link-local IP is refused.
//!
//! DNS names are not resolved unless [`ServerConfig::resolve_hostnames`] is
//! set. Without it, a name that points at `10.0.0.5` passes the gate; the
//! default keeps that gap visible (a debug line is logged) rather than
//! pretending the literal check covers it.
//!
//! [`ServerConfig::resolve_hostnames`]: crate::config::ServerConfig::resolve_hostnames

use crate::config::ServerConfig;
use crate::error::MarkdownifyError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;
use url::{Host, Url};

/// Check if the input string starts with an accepted URL scheme.
pub fn has_http_scheme(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Validate `raw` as a fetchable URL and return it parsed.
///
/// Fails with `InvalidInput` for a bad scheme or an unparsable URL and with
/// `UnsafeTarget` for a private host. The scheme check happens before any
/// parsing or network access.
pub async fn check_url(raw: &str, config: &ServerConfig) -> Result<Url, MarkdownifyError> {
    if !has_http_scheme(raw) {
        return Err(MarkdownifyError::invalid_input(
            "Only http:// and https:// URLs are allowed.",
        ));
    }

    let url = Url::parse(raw)
        .map_err(|e| MarkdownifyError::invalid_input(format!("Malformed URL '{raw}': {e}")))?;

    let host = url
        .host()
        .ok_or_else(|| MarkdownifyError::invalid_input(format!("URL '{raw}' has no host")))?;

    if config.allow_private_targets {
        return Ok(url);
    }

    match host {
        Host::Ipv4(ip) if is_private_ip(IpAddr::V4(ip)) => Err(unsafe_target(raw)),
        Host::Ipv6(ip) if is_private_ip(IpAddr::V6(ip)) => Err(unsafe_target(raw)),
        Host::Domain(name) if config.resolve_hostnames => {
            let port = url.port_or_known_default().unwrap_or(80);
            check_resolved(raw, name, port).await?;
            Ok(url)
        }
        Host::Domain(name) => {
            debug!("Host '{}' not resolved for private-address check", name);
            Ok(url)
        }
        _ => Ok(url),
    }
}

async fn check_resolved(raw: &str, name: &str, port: u16) -> Result<(), MarkdownifyError> {
    let addrs = tokio::net::lookup_host((name, port))
        .await
        .map_err(|e| MarkdownifyError::FetchFailed {
            url: raw.to_string(),
            status: None,
            reason: format!("could not resolve host '{name}': {e}"),
        })?;

    for addr in addrs {
        if is_private_ip(addr.ip()) {
            debug!("Host '{}' resolves to private address {}", name, addr.ip());
            return Err(unsafe_target(raw));
        }
    }
    Ok(())
}

fn unsafe_target(raw: &str) -> MarkdownifyError {
    MarkdownifyError::UnsafeTarget {
        url: raw.to_string(),
    }
}

/// Whether `ip` belongs to a range that must never be fetched.
///
/// Covers RFC 1918, loopback, link-local, unspecified, broadcast,
/// documentation, benchmarking, reserved and IETF-protocol ranges for IPv4,
/// and loopback, unspecified, unique-local, link-local, site-local and
/// documentation ranges for IPv6. IPv4-mapped, IPv4-compatible and NAT64
/// addresses are judged by their embedded IPv4 address.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || a == 0
        || a >= 240
        || (a == 192 && b == 0 && c == 0)
        || (a == 198 && (b & 0xfe) == 18)
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = embedded_v4(ip) {
        return is_private_v4(v4);
    }
    let seg = ip.segments();
    ip.is_loopback()
        || ip.is_unspecified()
        || (seg[0] & 0xfe00) == 0xfc00
        || (seg[0] & 0xffc0) == 0xfe80
        || (seg[0] & 0xffc0) == 0xfec0
        || (seg[0] == 0x2001 && seg[1] == 0x0db8)
}

/// The IPv4 address carried by an IPv4-mapped (`::ffff:a.b.c.d`),
/// IPv4-compatible (`::a.b.c.d`) or NAT64 (`64:ff9b::a.b.c.d`) address.
fn embedded_v4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }
    let seg = ip.segments();
    let tail = || {
        let [.., a, b, c, d] = ip.octets();
        Ipv4Addr::new(a, b, c, d)
    };
    match seg {
        // `::` and `::1` are judged as IPv6.
        [0, 0, 0, 0, 0, 0, 0, 0 | 1] => None,
        [0, 0, 0, 0, 0, 0, _, _] => Some(tail()),
        [0x64, 0xff9b, 0, 0, 0, 0, _, _] => Some(tail()),
        _ => None,
    }
}
