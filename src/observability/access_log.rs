//! Structured access log — JSON-formatted request/response logging
//!
//! Produces one structured entry per gateway request, suitable for
//! ingestion by log aggregation systems.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A single access log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// ISO 8601 timestamp
    pub timestamp: String,
    /// Client IP address
    pub client_ip: String,
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// HTTP status code written to the client
    pub status: u16,
    /// Response size in bytes
    pub response_bytes: u64,
    /// Request duration in milliseconds
    pub duration_ms: u64,
    /// Resolved route kind, if any
    pub route: Option<String>,
    /// Upstream service id the request was forwarded to
    pub upstream: Option<String>,
    /// Whether the body was synthesized by the failure/demo path
    pub synthesized: bool,
}

/// Access log manager — tracks and emits structured log entries
pub struct AccessLog {
    total_entries: AtomicU64,
}

impl AccessLog {
    pub fn new() -> Self {
        Self {
            total_entries: AtomicU64::new(0),
        }
    }

    /// Start tracking a request. Returns a RequestTracker to measure duration.
    pub fn start_request(&self) -> RequestTracker {
        RequestTracker {
            start: Instant::now(),
        }
    }

    /// Record and emit a log entry
    pub fn record(&self, entry: &AccessLogEntry) {
        self.total_entries.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            target: "access_log",
            client_ip = entry.client_ip,
            method = entry.method,
            path = entry.path,
            status = entry.status,
            duration_ms = entry.duration_ms,
            response_bytes = entry.response_bytes,
            route = entry.route.as_deref().unwrap_or("-"),
            upstream = entry.upstream.as_deref().unwrap_or("-"),
            synthesized = entry.synthesized,
            "{}",
            serde_json::to_string(entry).unwrap_or_default()
        );
    }

    /// Total number of logged entries
    pub fn total_entries(&self) -> u64 {
        self.total_entries.load(Ordering::Relaxed)
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Measures a request's duration from acceptance to response
pub struct RequestTracker {
    start: Instant,
}

impl RequestTracker {
    /// Build the log entry once the response is known
    #[allow(clippy::too_many_arguments)]
    pub fn build_entry(
        &self,
        client_ip: String,
        method: String,
        path: String,
        status: u16,
        response_bytes: u64,
        route: Option<String>,
        upstream: Option<String>,
        synthesized: bool,
    ) -> AccessLogEntry {
        AccessLogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            client_ip,
            method,
            path,
            status,
            response_bytes,
            duration_ms: self.start.elapsed().as_millis() as u64,
            route,
            upstream,
            synthesized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_increments_counter() {
        let log = AccessLog::new();
        let tracker = log.start_request();
        let entry = tracker.build_entry(
            "127.0.0.1".to_string(),
            "GET".to_string(),
            "/api/status".to_string(),
            200,
            128,
            Some("status-aggregate".to_string()),
            None,
            false,
        );
        log.record(&entry);
        log.record(&entry);
        assert_eq!(log.total_entries(), 2);
    }

    #[test]
    fn test_entry_serializes() {
        let log = AccessLog::new();
        let entry = log.start_request().build_entry(
            "10.0.0.1".to_string(),
            "POST".to_string(),
            "/api/query/logs".to_string(),
            200,
            2048,
            Some("demo-logs".to_string()),
            None,
            true,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["client_ip"], "10.0.0.1");
        assert_eq!(json["synthesized"], true);
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }
}
