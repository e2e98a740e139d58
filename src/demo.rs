//! Synthetic demo backend — plausible datasets for endpoints with no live
//! backend configured
//!
//! Sits behind the same response-mode seam as real backends, so handlers
//! treat it as just another target. The demo path never surfaces internal
//! errors: an unparseable query falls back to defaults.

use crate::proxy::{ProxyRequest, ProxyResponse};
use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use http::StatusCode;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A backend that answers from generated data instead of the network
#[async_trait]
pub trait SyntheticBackend: Send + Sync {
    /// Produce a complete response for the request
    async fn respond(&self, req: &ProxyRequest) -> ProxyResponse;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Log query filters, accepted as a JSON body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogQuery {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub limit: Option<usize>,
    pub service_name: Option<String>,
    pub log_level: Option<String>,
}

/// One generated log record, shaped like the real query API's results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoLogEntry {
    pub timestamp: String,
    pub service_name: String,
    pub log_level: String,
    pub message: String,
    pub partition_id: String,
}

const SERVICE_NAMES: &[&str] = &[
    "payment-service",
    "user-service",
    "order-service",
    "inventory-service",
    "notification-service",
];

const LOG_LEVELS: &[&str] = &["INFO", "WARN", "ERROR", "DEBUG"];

const MESSAGES: &[&str] = &[
    "Processing payment request",
    "User authentication successful",
    "Order created successfully",
    "Inventory check completed",
    "Notification sent",
    "Database connection established",
    "Cache hit for key",
    "Request processed in 45ms",
    "Failed to connect to external service",
    "Retry attempt 1 of 3",
    "Transaction committed",
    "Session expired",
    "Rate limit exceeded",
    "Validation error occurred",
    "File uploaded successfully",
];

const DEFAULT_LIMIT: usize = 20;

/// Synthetic log-query backend
pub struct DemoLogBackend {
    max_entries: usize,
}

impl DemoLogBackend {
    pub fn new() -> Self {
        Self { max_entries: 50 }
    }

    /// Generate entries honoring the query's filters and (capped) limit,
    /// newest first.
    pub fn generate(&self, query: &LogQuery) -> Vec<DemoLogEntry> {
        let mut rng = rand::thread_rng();
        let count = query.limit.unwrap_or(DEFAULT_LIMIT).min(self.max_entries);
        let base_time = Utc::now() - Duration::hours(1);

        let mut logs = Vec::with_capacity(count);
        for _ in 0..count {
            let service = query
                .service_name
                .clone()
                .unwrap_or_else(|| SERVICE_NAMES[rng.gen_range(0..SERVICE_NAMES.len())].to_string());
            let level = query
                .log_level
                .clone()
                .unwrap_or_else(|| LOG_LEVELS[rng.gen_range(0..LOG_LEVELS.len())].to_string());

            let timestamp = base_time + Duration::seconds(rng.gen_range(0..3600));
            logs.push(DemoLogEntry {
                timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                message: format!(
                    "[{}] {} - Request ID: {}",
                    service,
                    MESSAGES[rng.gen_range(0..MESSAGES.len())],
                    rng.gen_range(1000..10000)
                ),
                service_name: service,
                log_level: level,
                partition_id: format!("partition-{}", rng.gen_range(1..4)),
            });
        }

        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        logs
    }
}

impl Default for DemoLogBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyntheticBackend for DemoLogBackend {
    async fn respond(&self, req: &ProxyRequest) -> ProxyResponse {
        // Malformed bodies fall back to an unfiltered default query
        let mut query: LogQuery = serde_json::from_slice(&req.body).unwrap_or_default();
        let now = Utc::now();
        query.start_time.get_or_insert_with(|| {
            (now - Duration::days(7)).to_rfc3339_opts(SecondsFormat::Micros, true)
        });
        query
            .end_time
            .get_or_insert_with(|| now.to_rfc3339_opts(SecondsFormat::Micros, true));
        query.limit.get_or_insert(DEFAULT_LIMIT);

        let logs = self.generate(&query);
        let count = logs.len();
        ProxyResponse::json(
            StatusCode::OK,
            &serde_json::json!({
                "logs": logs,
                "count": count,
                "query": query,
                "demo": true,
            }),
        )
    }

    fn name(&self) -> &str {
        "demo-logs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method};

    fn request(body: &str) -> ProxyRequest {
        ProxyRequest {
            method: Method::POST,
            path: "/api/query/logs".to_string(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    #[test]
    fn test_generate_honors_limit() {
        let backend = DemoLogBackend::new();
        let logs = backend.generate(&LogQuery {
            limit: Some(5),
            ..LogQuery::default()
        });
        assert_eq!(logs.len(), 5);
    }

    #[test]
    fn test_generate_caps_limit() {
        let backend = DemoLogBackend::new();
        let logs = backend.generate(&LogQuery {
            limit: Some(10_000),
            ..LogQuery::default()
        });
        assert_eq!(logs.len(), 50);
    }

    #[test]
    fn test_generate_applies_filters() {
        let backend = DemoLogBackend::new();
        let logs = backend.generate(&LogQuery {
            limit: Some(30),
            service_name: Some("payment-service".to_string()),
            log_level: Some("ERROR".to_string()),
            ..LogQuery::default()
        });
        assert!(logs
            .iter()
            .all(|l| l.service_name == "payment-service" && l.log_level == "ERROR"));
    }

    #[test]
    fn test_generate_sorts_descending() {
        let backend = DemoLogBackend::new();
        let logs = backend.generate(&LogQuery {
            limit: Some(40),
            ..LogQuery::default()
        });
        for pair in logs.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_respond_shape() {
        let backend = DemoLogBackend::new();
        let resp = backend
            .respond(&request(r#"{"limit": 3, "logLevel": "INFO"}"#))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["demo"], true);
        assert_eq!(body["count"], 3);
        assert_eq!(body["logs"].as_array().unwrap().len(), 3);
        assert_eq!(body["query"]["limit"], 3);
        assert!(body["query"]["startTime"].is_string());
        assert!(body["query"]["endTime"].is_string());
    }

    #[tokio::test]
    async fn test_respond_tolerates_malformed_body() {
        let backend = DemoLogBackend::new();
        let resp = backend.respond(&request("{not json")).await;
        assert_eq!(resp.status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["count"], DEFAULT_LIMIT);
    }

    #[test]
    fn test_log_query_camel_case() {
        let query: LogQuery =
            serde_json::from_str(r#"{"serviceName": "x", "logLevel": "WARN"}"#).unwrap();
        assert_eq!(query.service_name.as_deref(), Some("x"));
        assert_eq!(query.log_level.as_deref(), Some("WARN"));
    }
}
