use axum::http::HeaderMap;
use sqlx::types::ipnetwork::IpNetwork;

/// Client address as reported by the reverse proxy.
pub fn client_ip(headers: &HeaderMap) -> Option<IpNetwork> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    forwarded
        .or(real_ip)
        .and_then(|raw| raw.parse::<std::net::IpAddr>().ok())
        .map(IpNetwork::from)
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.1"));
        assert_eq!(client_ip(&headers).map(|ip| ip.ip().to_string()), Some("10.0.0.1".into()));
    }

    #[test]
    fn falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.1"));
        assert_eq!(client_ip(&headers).map(|ip| ip.ip().to_string()), Some("192.168.1.1".into()));
        assert!(client_ip(&HeaderMap::new()).is_none());
    }
}
