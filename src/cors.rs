//! CORS envelope — uniform cross-origin headers on every response
//!
//! The envelope is the single exit point of the pipeline: every
//! `ProxyResponse` (live, synthesized, or error) passes through
//! [`finalize`] exactly once, so no code path can skip the header set.

use crate::proxy::ProxyResponse;
use bytes::Bytes;
use http::header::HeaderValue;
use http_body_util::Full;
use hyper::Response;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS, PATCH";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, Accept, X-Requested-With";
pub const MAX_AGE_SECS: u64 = 3600;

fn with_cors(builder: http::response::Builder) -> http::response::Builder {
    builder
        .header("Access-Control-Allow-Origin", ALLOW_ORIGIN)
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Max-Age", MAX_AGE_SECS.to_string())
}

/// Answer an `OPTIONS` preflight: bare 200, full header set, no body
pub fn preflight_response() -> Response<Full<Bytes>> {
    with_cors(Response::builder().status(200))
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Wrap the final payload — the last step on every code path
pub fn finalize(resp: ProxyResponse) -> Response<Full<Bytes>> {
    let content_type = HeaderValue::from_str(&resp.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let mut builder = with_cors(Response::builder().status(resp.status))
        .header(http::header::CONTENT_TYPE, content_type);

    for (name, value) in resp.headers.iter() {
        builder = builder.header(name, value);
    }

    builder.body(Full::new(resp.body)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_preflight_has_full_header_set_and_empty_body() {
        let resp = preflight_response();
        assert_eq!(resp.status(), 200);
        let headers = resp.headers();
        assert_eq!(headers["Access-Control-Allow-Origin"], "*");
        assert!(headers["Access-Control-Allow-Methods"]
            .to_str()
            .unwrap()
            .contains("OPTIONS"));
        assert!(headers["Access-Control-Allow-Headers"]
            .to_str()
            .unwrap()
            .contains("Content-Type"));
        assert!(headers.contains_key("Access-Control-Max-Age"));
    }

    #[test]
    fn test_finalize_attaches_cors_to_success() {
        let resp = finalize(ProxyResponse::json(
            StatusCode::OK,
            &serde_json::json!({"ok": true}),
        ));
        assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");
        assert_eq!(
            resp.headers()[http::header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn test_finalize_attaches_cors_to_errors() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let resp = finalize(ProxyResponse::json(status, &serde_json::json!({})));
            assert_eq!(resp.status(), status);
            assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");
        }
    }

    #[test]
    fn test_finalize_rejects_invalid_content_type_gracefully() {
        let mut pr = ProxyResponse::json(StatusCode::OK, &serde_json::json!({}));
        pr.content_type = "bad\r\nvalue".to_string();
        let resp = finalize(pr);
        assert_eq!(
            resp.headers()[http::header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }
}
