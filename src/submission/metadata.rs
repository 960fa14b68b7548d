use std::net::IpAddr;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use ipnet::IpNet;

/// Per-request facts captured at the edge and folded into the submission record.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip: String,
    pub user_agent: String,
    pub received_at: DateTime<Utc>,
}

/// Extract submission metadata from request headers.
pub fn extract(
    headers: &HeaderMap,
    peer_addr: Option<IpAddr>,
    trusted_proxies: &[IpNet],
) -> RequestMeta {
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    RequestMeta {
        ip: extract_ip(headers, peer_addr, trusted_proxies),
        user_agent,
        received_at: Utc::now(),
    }
}

fn extract_ip(
    headers: &HeaderMap,
    peer_addr: Option<IpAddr>,
    trusted_proxies: &[IpNet],
) -> String {
    let peer = peer_addr.unwrap_or(IpAddr::from([127, 0, 0, 1]));

    // Forwarding headers only count when the direct connection is a trusted proxy
    if trusted_proxies.is_empty() || !trusted_proxies.iter().any(|net| net.contains(&peer)) {
        return peer.to_string();
    }

    if let Some(ip) = headers
        .get("cf-connecting-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip.to_string();
    }

    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        // Take the first (leftmost) IP that isn't a trusted proxy
        for ip_str in xff.split(',').map(|s| s.trim()) {
            if let Ok(ip) = ip_str.parse::<IpAddr>() {
                if !trusted_proxies.iter().any(|net| net.contains(&ip)) {
                    return ip.to_string();
                }
            }
        }
    }

    peer.to_string()
}

