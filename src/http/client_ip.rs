//! 客户端标识派生
//!
//! 从可信代理头链取第一个非空值，全部缺失时退回固定默认值。
//! 该标识只用作限流键，不落盘。

use axum::http::HeaderMap;

/// 兜底标识（本地直连 / 无代理头）
const FALLBACK_CLIENT_ID: &str = "local";

/// 派生客户端标识
///
/// 优先级：`x-forwarded-for` 的第一项 → `x-real-ip` → `cf-connecting-ip`
/// → `"local"`。
pub fn derive_client_id(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    for name in ["x-real-ip", "cf-connecting-ip"] {
        if let Some(value) = header_str(headers, name) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    FALLBACK_CLIENT_ID.to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_for_first_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(derive_client_id(&headers), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.4".parse().unwrap());
        assert_eq!(derive_client_id(&headers), "198.51.100.4");
    }

    #[test]
    fn test_cdn_header_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", "192.0.2.9".parse().unwrap());
        assert_eq!(derive_client_id(&headers), "192.0.2.9");
    }

    #[test]
    fn test_default_when_no_headers() {
        assert_eq!(derive_client_id(&HeaderMap::new()), "local");
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "  ".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.4".parse().unwrap());
        assert_eq!(derive_client_id(&headers), "198.51.100.4");
    }
}
