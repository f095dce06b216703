//! SSRF (Server-Side Request Forgery) validation
//!
//! Client-supplied URLs are checked in a fixed order before anything is
//! fetched:
//! 1. the URL parses and has a host
//! 2. the scheme is `http` or `https`
//! 3. no userinfo is embedded
//! 4. the host is not `localhost`
//! 5. a literal IP host is not in a blocked range
//!
//! Hostnames are then resolved and every resolved address must pass the same
//! IP rules (DNS rebinding); see [`check_resolved`].

use reqwest::Url;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use thiserror::Error;

/// Why a URL was refused. Clients only ever see "URL not allowed"; the
/// variant is kept for logs and tests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UrlRejection {
    #[error("malformed URL: {0}")]
    Malformed(String),

    #[error("scheme {0:?} is not http or https")]
    SchemeNotAllowed(String),

    #[error("URL embeds credentials")]
    EmbeddedCredentials,

    #[error("host {0:?} is localhost")]
    Localhost(String),

    #[error("address {0} is in a blocked range")]
    ForbiddenAddress(IpAddr),

    #[error("host {0:?} is not in the allowlist")]
    NotAllowlisted(String),
}

/// Settings for the guard, taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct UrlPolicy {
    pub allow_private_ips: bool,
    pub allowlist: Option<Vec<String>>,
}

/// A URL that passed the static checks, with its host split out.
#[derive(Debug, Clone)]
pub struct ValidatedUrl {
    pub url: Url,
    /// Host without brackets, lowercased.
    pub host: String,
    pub port: u16,
    /// Set when the host is a literal address.
    pub literal_ip: Option<IpAddr>,
}

pub fn validate_url(raw: &str, policy: &UrlPolicy) -> Result<ValidatedUrl, UrlRejection> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlRejection::Malformed(e.to_string()))?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlRejection::Malformed("URL has no host".to_string()))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_lowercase();

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(UrlRejection::SchemeNotAllowed(scheme.to_string()));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlRejection::EmbeddedCredentials);
    }

    if !policy.allow_private_ips && is_localhost(&host) {
        return Err(UrlRejection::Localhost(host));
    }

    // The URL parser already normalises decimal, octal and hex IPv4 forms
    // into dotted quads, so they land here as literals.
    let literal_ip = host.parse::<IpAddr>().ok();
    if let Some(ip) = literal_ip {
        if !policy.allow_private_ips && is_forbidden_ip(&ip) {
            return Err(UrlRejection::ForbiddenAddress(ip));
        }
    }

    if let Some(allowed) = policy.allowlist.as_deref() {
        let listed = allowed
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));
        if !listed {
            return Err(UrlRejection::NotAllowlisted(host));
        }
    }

    let port = url.port_or_known_default().unwrap_or(80);
    Ok(ValidatedUrl {
        url,
        host,
        port,
        literal_ip,
    })
}

/// Every address a hostname resolved to must be allowed.
pub fn check_resolved(addrs: &[SocketAddr], policy: &UrlPolicy) -> Result<(), UrlRejection> {
    if policy.allow_private_ips {
        return Ok(());
    }
    match addrs.iter().find(|addr| is_forbidden_ip(&addr.ip())) {
        Some(addr) => Err(UrlRejection::ForbiddenAddress(addr.ip())),
        None => Ok(()),
    }
}

fn is_localhost(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    host == "localhost" || host.ends_with(".localhost")
}

/// Loopback, private, link-local, shared, multicast, broadcast, reserved and
/// unspecified addresses, plus IPv6 forms that embed one of them.
pub fn is_forbidden_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_forbidden_v4(v4),
        IpAddr::V6(v6) => is_forbidden_v6(v6),
    }
}

fn is_forbidden_v4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || octets[0] == 0 // 0.0.0.0/8
        || (octets[0] == 100 && (octets[1] & 0xc0) == 64) // 100.64.0.0/10
        || octets[0] >= 240 // 240.0.0.0/4
}

fn is_forbidden_v6(ip: &Ipv6Addr) -> bool {
    let segments = ip.segments();
    if ip.is_unspecified() || ip.is_loopback() || ip.is_multicast() {
        return true;
    }
    if segments[0] & 0xffc0 == 0xfe80 || segments[0] & 0xfe00 == 0xfc00 {
        return true;
    }
    // NAT64 well-known prefix 64:ff9b::/96
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let embedded = Ipv4Addr::new(
            (segments[6] >> 8) as u8,
            segments[6] as u8,
            (segments[7] >> 8) as u8,
            segments[7] as u8,
        );
        return is_forbidden_v4(&embedded);
    }
    // IPv4-mapped (::ffff:a.b.c.d) and IPv4-compatible (::a.b.c.d)
    match ip.to_ipv4() {
        Some(v4) => is_forbidden_v4(&v4),
        None => false,
    }
}
