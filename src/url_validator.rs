//! Validation of submitted source URLs.
//!
//! A submitted locator is handed to the external analysis service, so it is
//! checked first: well-formed, http(s), has a host, and does not resolve to
//! an internal address (SSRF prevention). Papers can come from any public
//! host; there is no domain allowlist.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};
use url::Url;

#[derive(Debug, Clone)]
pub enum UrlValidationError {
    /// URL is malformed or cannot be parsed
    InvalidUrl(String),
    /// URL uses a scheme other than http/https
    UnsupportedScheme(String),
    /// Resolved IP is a private/internal address
    InternalIpAddress(String),
    /// DNS resolution failed
    DnsResolutionFailed(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlValidationError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            UrlValidationError::UnsupportedScheme(scheme) => {
                write!(f, "Only http(s) URLs are supported, got {}", scheme)
            }
            UrlValidationError::InternalIpAddress(ip) => {
                write!(f, "Internal addresses are not allowed: {}", ip)
            }
            UrlValidationError::DnsResolutionFailed(msg) => {
                write!(f, "DNS resolution failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// Check if an IPv4 address is internal/private
fn is_internal_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        // Shared address space (100.64.0.0/10)
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xC0) == 64)
}

/// Check if an IPv6 address is internal/private
fn is_internal_ipv6(ip: &Ipv6Addr) -> bool {
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.to_ipv4_mapped().map(|v4| is_internal_ipv4(&v4)).unwrap_or(false)
        // Unique local addresses (fc00::/7)
        || (ip.segments()[0] & 0xFE00) == 0xFC00
        // Link-local (fe80::/10)
        || (ip.segments()[0] & 0xFFC0) == 0xFE80
}

fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => is_internal_ipv6(v6),
    }
}

/// Validate a submitted source URL before it is sent to the analyzer.
///
/// Checks, in order: the URL parses, the scheme is http or https, a host is
/// present, and every address the host resolves to is public.
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str).map_err(|e| UrlValidationError::InvalidUrl(e.to_string()))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .ok_or_else(|| UrlValidationError::InvalidUrl("No host in URL".to_string()))?;

    let port = url.port().unwrap_or(if url.scheme() == "https" { 443 } else { 80 });
    let socket_addr = format!("{}:{}", host, port);

    match socket_addr.to_socket_addrs() {
        Ok(addrs) => {
            for addr in addrs {
                if is_internal_ip(&addr.ip()) {
                    return Err(UrlValidationError::InternalIpAddress(addr.ip().to_string()));
                }
            }
        }
        Err(e) => {
            return Err(UrlValidationError::DnsResolutionFailed(e.to_string()));
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_ips() {
        // IPv4
        assert!(is_internal_ipv4(&Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(192, 168, 1, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(172, 16, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(169, 254, 1, 1)));
        assert!(!is_internal_ipv4(&Ipv4Addr::new(8, 8, 8, 8)));

        // IPv6
        assert!(is_internal_ipv6(&Ipv6Addr::LOCALHOST));
        assert!(is_internal_ipv6(&Ipv6Addr::UNSPECIFIED));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let result = validate_url("ftp://example.org/paper.pdf");
        assert!(matches!(result, Err(UrlValidationError::UnsupportedScheme(_))));
        let result = validate_url("file:///etc/passwd");
        assert!(matches!(result, Err(UrlValidationError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_rejects_malformed_url() {
        let result = validate_url("not a url at all");
        assert!(matches!(result, Err(UrlValidationError::InvalidUrl(_))));
    }

    #[test]
    fn test_rejects_loopback_target() {
        let result = validate_url("http://127.0.0.1:8080/paper");
        assert!(matches!(result, Err(UrlValidationError::InternalIpAddress(_))));
    }
}
