use axum::http::HeaderMap;

pub const API_KEY_HEADER: &str = "API_KEY";
pub const REAL_IP_HEADER: &str = "X-Real-IP";
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// Identity a request is rate limited under.
///
/// A non-empty `API_KEY` header wins outright; such a request is limited
/// against the token policy alone, even if the connection's IP is over
/// its own limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Token(String),
    Ip(String),
}

impl Classification {
    /// Namespaced store key. The `token:`/`ip:` prefixes keep the two
    /// kinds from ever colliding on the same raw value.
    pub fn rate_key(&self) -> String {
        match self {
            Classification::Token(token) => format!("token:{token}"),
            Classification::Ip(ip) => format!("ip:{ip}"),
        }
    }
}

/// Classify a request from its headers and transport-level peer address.
pub fn classify(headers: &HeaderMap, peer_addr: &str) -> Classification {
    if let Some(token) = header_value(headers, API_KEY_HEADER) {
        if !token.is_empty() {
            return Classification::Token(token.to_string());
        }
    }
    Classification::Ip(client_ip(headers, peer_addr))
}

/// Resolve the client IP: trusted `X-Real-IP` verbatim, else the first
/// `X-Forwarded-For` entry, else the peer address with any trailing
/// `:port` stripped.
pub fn client_ip(headers: &HeaderMap, peer_addr: &str) -> String {
    if let Some(ip) = header_value(headers, REAL_IP_HEADER) {
        if !ip.is_empty() {
            return ip.to_string();
        }
    }

    if let Some(forwarded) = header_value(headers, FORWARDED_FOR_HEADER) {
        if !forwarded.is_empty() {
            if let Some(first) = forwarded.split(',').next() {
                return first.trim().to_string();
            }
        }
    }

    match peer_addr.rfind(':') {
        Some(idx) => peer_addr[..idx].to_string(),
        None => peer_addr.to_string(),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn token_header_takes_precedence_over_ip() {
        let headers = headers(&[("API_KEY", "abc123"), ("X-Real-IP", "10.0.0.1")]);
        let classification = classify(&headers, "192.168.1.1:12345");
        assert_eq!(classification, Classification::Token("abc123".to_string()));
        assert_eq!(classification.rate_key(), "token:abc123");
    }

    #[test]
    fn empty_token_header_falls_through_to_ip() {
        let headers = headers(&[("API_KEY", ""), ("X-Real-IP", "10.0.0.1")]);
        let classification = classify(&headers, "192.168.1.1:12345");
        assert_eq!(classification, Classification::Ip("10.0.0.1".to_string()));
    }

    #[test]
    fn real_ip_wins_over_forwarded_for() {
        let headers = headers(&[
            ("X-Real-IP", "10.0.0.1"),
            ("X-Forwarded-For", "10.0.0.2"),
        ]);
        assert_eq!(client_ip(&headers, "192.168.1.1:12345"), "10.0.0.1");
    }

    #[test]
    fn forwarded_for_takes_first_entry() {
        let headers = headers(&[("X-Forwarded-For", "10.0.0.2, 10.0.0.3")]);
        assert_eq!(client_ip(&headers, "192.168.1.1:12345"), "10.0.0.2");
    }

    #[test]
    fn peer_address_fallback_strips_port() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, "192.168.1.1:12345"), "192.168.1.1");
    }

    #[test]
    fn peer_address_without_port_is_used_verbatim() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, "192.168.1.1"), "192.168.1.1");
    }

    #[test]
    fn same_raw_value_yields_distinct_keys_per_kind() {
        let token = Classification::Token("10.0.0.1".to_string());
        let ip = Classification::Ip("10.0.0.1".to_string());
        assert_ne!(token.rate_key(), ip.rate_key());
    }
}
