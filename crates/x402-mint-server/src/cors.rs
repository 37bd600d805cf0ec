use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};

use crate::gate::{PAYMENT_FROM_HEADER, PAYMENT_REQUIRED_HEADER, PAYMENT_RESPONSE_HEADER, PAYMENT_SIGNATURE_HEADER};

fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    if allowed.is_empty() {
        // Match http://localhost or http://localhost:PORT exactly
        return origin == "http://localhost" || origin.starts_with("http://localhost:");
    }
    allowed.iter().any(|a| a == "*" || a == origin)
}

/// CORS for browser x402 clients. No configured origins means localhost only.
pub fn build_cors(allowed_origins: &[String]) -> Cors {
    let allowed = allowed_origins.to_vec();
    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            origin
                .to_str()
                .map(|o| origin_allowed(&allowed, o))
                .unwrap_or(false)
        })
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static(PAYMENT_SIGNATURE_HEADER),
            HeaderName::from_static(PAYMENT_FROM_HEADER),
        ])
        .expose_headers(vec![
            HeaderName::from_static(PAYMENT_REQUIRED_HEADER),
            HeaderName::from_static(PAYMENT_RESPONSE_HEADER),
        ])
        .max_age(3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_localhost_only() {
        assert!(origin_allowed(&[], "http://localhost:3000"));
        assert!(origin_allowed(&[], "http://localhost"));
        assert!(!origin_allowed(&[], "http://localhost.evil.com"));
        assert!(!origin_allowed(&[], "https://example.com"));
    }

    #[test]
    fn test_configured_origins_are_exact() {
        let allowed = vec!["https://app.example".to_string()];
        assert!(origin_allowed(&allowed, "https://app.example"));
        assert!(!origin_allowed(&allowed, "https://app.example.evil"));
        assert!(origin_allowed(&["*".to_string()], "https://anything"));
    }
}
