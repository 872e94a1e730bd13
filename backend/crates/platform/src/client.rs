//! Client identification

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Resolve the client IP address.
///
/// The first entry of `X-Forwarded-For` wins (reverse proxy setups), then
/// the direct connection address.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or(direct_ip)
}
