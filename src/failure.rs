//! Failure synthesizer — converts every backend failure into structured,
//! well-formed JSON the dashboard can always render
//!
//! This is the single source of truth for the failure policy table. Routes
//! carry a [`FailurePolicy`]: `shield` answers 200 with the error embedded
//! in the body (polling clients keep functioning), `propagate` surfaces the
//! real transport/status semantics. All detail strings are truncated so a
//! verbose backend cannot inflate responses.

use crate::config::FailurePolicy;
use crate::proxy::{ProxyResponse, TransportError};
use http::StatusCode;
use serde_json::json;

/// Character budget for error messages surfaced to the client
pub const ERROR_DETAIL_BUDGET: usize = 200;

/// Character budget for diagnostic payload excerpts (backend error bodies)
pub const DIAGNOSTIC_BUDGET: usize = 500;

/// Truncate to a character budget, appending an ellipsis when cut
pub fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut out: String = text.chars().take(budget).collect();
    out.push('…');
    out
}

/// Synthesize a response for an outbound transport failure
pub fn transport_failure(err: &TransportError, policy: FailurePolicy) -> ProxyResponse {
    let message = truncate(&err.to_string(), ERROR_DETAIL_BUDGET);
    match policy {
        FailurePolicy::Shield => ProxyResponse::json(
            StatusCode::OK,
            &json!({
                "status": "error",
                "error": "Backend unavailable",
                "message": message,
            }),
        ),
        FailurePolicy::Propagate => {
            let status = match err {
                TransportError::ConnectionRefused(_) => StatusCode::SERVICE_UNAVAILABLE,
                TransportError::Timeout(_)
                | TransportError::Network(_)
                | TransportError::Other(_) => StatusCode::BAD_GATEWAY,
            };
            ProxyResponse::json(
                status,
                &json!({
                    "error": "Proxy Error",
                    "message": message,
                    "status": status.as_u16(),
                }),
            )
        }
    }
}

/// Synthesize a response for a backend that answered with an error status.
///
/// Only shield routes call this — propagate routes forward the backend's
/// own status and normalized body untouched.
pub fn backend_error(status: StatusCode, detail: &str) -> ProxyResponse {
    ProxyResponse::json(
        StatusCode::OK,
        &json!({
            "status": "error",
            "error": format!("Backend returned {}", status.as_u16()),
            "message": truncate(detail, DIAGNOSTIC_BUDGET),
        }),
    )
}

/// Health probe failure: always 200 so polling dashboards keep rendering
pub fn health_down(error: &str) -> ProxyResponse {
    ProxyResponse::json(
        StatusCode::OK,
        &json!({
            "status": "DOWN",
            "error": truncate(error, ERROR_DETAIL_BUDGET),
        }),
    )
}

/// No route matched the request path
pub fn not_found(path: &str) -> ProxyResponse {
    ProxyResponse::json(
        StatusCode::NOT_FOUND,
        &json!({
            "error": "Not Found",
            "message": format!("Unknown proxy path: {}", truncate(path, ERROR_DETAIL_BUDGET)),
            "status": 404,
        }),
    )
}

/// A service id outside the allow-list — rejected before any outbound call
pub fn unknown_service(id: &str) -> ProxyResponse {
    ProxyResponse::json(
        StatusCode::BAD_REQUEST,
        &json!({
            "error": "Unknown service",
            "message": format!("Service '{}' is not configured", truncate(id, ERROR_DETAIL_BUDGET)),
            "status": 400,
        }),
    )
}

/// The client's request is missing something the route requires
pub fn bad_request(message: &str) -> ProxyResponse {
    ProxyResponse::json(
        StatusCode::BAD_REQUEST,
        &json!({
            "status": "error",
            "error": truncate(message, ERROR_DETAIL_BUDGET),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_json(resp: &ProxyResponse) -> serde_json::Value {
        serde_json::from_slice(&resp.body).unwrap()
    }

    #[test]
    fn test_truncate_within_budget() {
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_truncate_over_budget() {
        let out = truncate(&"x".repeat(300), 200);
        assert_eq!(out.chars().count(), 201);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        // Multi-byte characters must not be split
        let out = truncate("ééééé", 3);
        assert_eq!(out, "ééé…");
    }

    #[test]
    fn test_connection_refused_propagate_is_503() {
        let err = TransportError::ConnectionRefused("connection refused".to_string());
        let resp = transport_failure(&err, FailurePolicy::Propagate);
        assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(&resp);
        assert_eq!(body["status"], 503);
        assert_eq!(body["error"], "Proxy Error");
    }

    #[test]
    fn test_timeout_propagate_is_502() {
        let err = TransportError::Timeout(10_000);
        let resp = transport_failure(&err, FailurePolicy::Propagate);
        assert_eq!(resp.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_shield_masks_transport_failure_as_200() {
        let err = TransportError::ConnectionRefused("connection refused".to_string());
        let resp = transport_failure(&err, FailurePolicy::Shield);
        assert_eq!(resp.status, StatusCode::OK);
        let body = body_json(&resp);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("refused"));
    }

    #[test]
    fn test_backend_error_is_bounded() {
        let huge = "e".repeat(10_000);
        let resp = backend_error(StatusCode::INTERNAL_SERVER_ERROR, &huge);
        assert_eq!(resp.status, StatusCode::OK);
        let body = body_json(&resp);
        assert!(body["message"].as_str().unwrap().chars().count() <= DIAGNOSTIC_BUDGET + 1);
    }

    #[test]
    fn test_health_down_shape() {
        let resp = health_down("Service unavailable");
        assert_eq!(resp.status, StatusCode::OK);
        let body = body_json(&resp);
        assert_eq!(body["status"], "DOWN");
        assert_eq!(body["error"], "Service unavailable");
    }

    #[test]
    fn test_not_found_shape() {
        let resp = not_found("/nope");
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        let body = body_json(&resp);
        assert_eq!(body["status"], 404);
        assert!(body["message"].as_str().unwrap().contains("/nope"));
    }

    #[test]
    fn test_unknown_service_is_400() {
        let resp = unknown_service("attacker-host");
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    }
}
