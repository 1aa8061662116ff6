//! Click metadata extraction from request headers.

use axum::http::{HeaderMap, header};
use std::net::SocketAddr;

use crate::domain::events::ClickMetadata;

/// Resolves the client IP.
///
/// When the service runs behind a trusted proxy the first `X-Forwarded-For`
/// entry wins, then `X-Real-IP`; otherwise only the peer address is used.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, behind_proxy: bool) -> Option<String> {
    if behind_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = real_ip {
            return Some(ip.to_string());
        }
    }

    peer.map(|addr| addr.ip().to_string())
}

/// Builds [`ClickMetadata`] from the request headers and peer address.
pub fn click_metadata(headers: &HeaderMap, peer: Option<SocketAddr>, behind_proxy: bool) -> ClickMetadata {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };

    ClickMetadata::new(
        client_ip(headers, peer, behind_proxy),
        header_str(header::USER_AGENT),
        header_str(header::REFERER),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:51234".parse().unwrap())
    }

    #[test]
    fn test_peer_address_without_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));

        assert_eq!(client_ip(&headers, peer(), false).as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_forwarded_for_first_entry_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );

        assert_eq!(client_ip(&headers, peer(), true).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_real_ip_fallback_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        assert_eq!(client_ip(&headers, peer(), true).as_deref(), Some("198.51.100.4"));
        assert_eq!(client_ip(&HeaderMap::new(), peer(), true).as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_click_metadata_reads_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://ref.example"));

        let meta = click_metadata(&headers, None, false);

        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(meta.referer.as_deref(), Some("https://ref.example"));
        assert_eq!(meta.ip_address, None);
    }
}
