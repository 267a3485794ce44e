use crate::server::request::Headers;

pub const X_REAL_IP: &str = "X-Real-Ip";
pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";

/// Best-effort address of the client that originated a request, taking
/// forwarding headers set by reverse proxies into account.
///
/// Priority: the first `X-Forwarded-For` entry, then `X-Real-Ip` verbatim,
/// then the peer address with its port removed. The headers are trusted as
/// given; the result is meant for logging, not for access control.
pub fn resolve(headers: &Headers, raw_peer_addr: &str) -> String {
    let real_ip = headers.get(X_REAL_IP);
    let forwarded_for = headers.get(X_FORWARDED_FOR);

    if real_ip.is_empty() && forwarded_for.is_empty() {
        return strip_port(raw_peer_addr).to_string();
    }

    if !forwarded_for.is_empty() {
        // TODO: skip loopback and private entries once there is a list of trusted proxies
        return forwarded_for
            .split(',')
            .map(str::trim)
            .next()
            .unwrap_or_default()
            .to_string();
    }

    real_ip.to_string()
}

/// "[::1]:58292" => "[::1]", "10.0.0.1:80" => "10.0.0.1"
pub fn strip_port(addr: &str) -> &str {
    match addr.rfind(':') {
        Some(idx) => &addr[..idx],
        None => addr,
    }
}
