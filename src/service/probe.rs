//! Health probing and multi-service aggregation

use super::ServiceTarget;
use crate::exposition;
use crate::failure;
use crate::proxy::{Forwarder, TransportError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timeout for exposition-format metric scrapes — longer than a liveness
/// probe, since metric endpoints can be slow to render
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

/// Probed liveness of one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Up,
    Down,
    Error,
}

/// Result of probing one backend's health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HealthResult {
    pub service: String,
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probes backend health endpoints and builds aggregate views
pub struct HealthProber {
    forwarder: Arc<Forwarder>,
}

impl HealthProber {
    pub fn new(forwarder: Arc<Forwarder>) -> Self {
        Self { forwarder }
    }

    /// Probe a single service's health endpoint.
    ///
    /// Unreachable backends are DOWN; timeouts and unexpected transport
    /// failures are ERROR. Either way the caller gets a result, never an
    /// error to propagate.
    pub async fn probe(&self, target: &ServiceTarget) -> HealthResult {
        let start = Instant::now();
        match self
            .forwarder
            .get(&target.health_url(), target.probe_timeout)
            .await
        {
            Ok(raw) => {
                let status = if raw.status.is_success() {
                    HealthState::Up
                } else {
                    HealthState::Down
                };
                HealthResult {
                    service: target.id.clone(),
                    status,
                    status_code: Some(raw.status.as_u16()),
                    latency_ms: start.elapsed().as_millis() as u64,
                    error: None,
                }
            }
            Err(e) => {
                let status = match e {
                    TransportError::ConnectionRefused(_) | TransportError::Network(_) => {
                        HealthState::Down
                    }
                    TransportError::Timeout(_) | TransportError::Other(_) => HealthState::Error,
                };
                HealthResult {
                    service: target.id.clone(),
                    status,
                    status_code: None,
                    latency_ms: start.elapsed().as_millis() as u64,
                    error: Some(failure::truncate(
                        &e.to_string(),
                        failure::ERROR_DETAIL_BUDGET,
                    )),
                }
            }
        }
    }

    /// Probe all given services concurrently.
    ///
    /// The aggregate always contains exactly one entry per service — a
    /// failed probe contributes its error entry, never a gap.
    pub async fn probe_all(
        &self,
        targets: &[Arc<ServiceTarget>],
    ) -> BTreeMap<String, HealthResult> {
        let mut handles = Vec::with_capacity(targets.len());
        for target in targets {
            let prober = Self {
                forwarder: self.forwarder.clone(),
            };
            let target = target.clone();
            handles.push((
                target.id.clone(),
                tokio::spawn(async move { prober.probe(&target).await }),
            ));
        }

        let mut results = BTreeMap::new();
        for (id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => HealthResult {
                    service: id.clone(),
                    status: HealthState::Error,
                    status_code: None,
                    latency_ms: 0,
                    error: Some(format!("probe task failed: {}", e)),
                },
            };
            results.insert(id, result);
        }
        results
    }

    /// Combined health + parsed metrics summary for one service:
    /// `{service, health, metrics, timestamp}`.
    ///
    /// Any failure along the way collapses to `{service, error, timestamp}`
    /// — the summary endpoint always answers with a renderable object.
    pub async fn metrics_summary(&self, target: &ServiceTarget) -> serde_json::Value {
        let timestamp = epoch_secs();

        let health = match self
            .forwarder
            .get(&target.health_url(), target.probe_timeout)
            .await
        {
            Ok(raw) => serde_json::from_slice::<serde_json::Value>(&raw.body)
                .unwrap_or_else(|_| {
                    serde_json::json!({
                        "status": if raw.status.is_success() { "UP" } else { "DOWN" }
                    })
                }),
            Err(e) => {
                return summary_error(&target.id, &e.to_string(), timestamp);
            }
        };

        let metrics = match self
            .forwarder
            .get(&target.metrics_url(), SCRAPE_TIMEOUT)
            .await
        {
            Ok(raw) if raw.status.is_success() => {
                let text = String::from_utf8_lossy(&raw.body);
                exposition::parse(&text)
            }
            Ok(raw) => {
                return summary_error(
                    &target.id,
                    &format!("metrics endpoint returned {}", raw.status.as_u16()),
                    timestamp,
                );
            }
            Err(e) => {
                return summary_error(&target.id, &e.to_string(), timestamp);
            }
        };

        serde_json::json!({
            "service": target.id,
            "health": health,
            "metrics": metrics,
            "timestamp": timestamp,
        })
    }
}

fn summary_error(service: &str, error: &str, timestamp: f64) -> serde_json::Value {
    serde_json::json!({
        "service": service,
        "error": failure::truncate(error, failure::ERROR_DETAIL_BUDGET),
        "timestamp": timestamp,
    })
}

fn epoch_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> ServiceTarget {
        ServiceTarget {
            id: "test".to_string(),
            base_url: url.trim_end_matches('/').to_string(),
            health_path: "/actuator/health".to_string(),
            metrics_path: "/actuator/prometheus".to_string(),
            probe_timeout: Duration::from_secs(2),
            monitored: true,
        }
    }

    #[test]
    fn test_health_state_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&HealthState::Up).unwrap(),
            "\"UP\""
        );
        assert_eq!(
            serde_json::to_string(&HealthState::Down).unwrap(),
            "\"DOWN\""
        );
        assert_eq!(
            serde_json::to_string(&HealthState::Error).unwrap(),
            "\"ERROR\""
        );
    }

    #[test]
    fn test_health_result_omits_empty_fields() {
        let result = HealthResult {
            service: "svc".to_string(),
            status: HealthState::Up,
            status_code: Some(200),
            latency_ms: 12,
            error: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "UP");
        assert_eq!(json["status_code"], 200);
        assert!(json.get("error").is_none());
    }

    /// A localhost URL with nothing listening on it
    async fn dead_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_probe_refused_connection_is_down() {
        let prober = HealthProber::new(Arc::new(Forwarder::new()));
        let result = prober.probe(&target(&dead_url().await)).await;
        assert_eq!(result.status, HealthState::Down);
        assert!(result.error.is_some());
        assert!(result.status_code.is_none());
    }

    #[tokio::test]
    async fn test_probe_all_has_entry_per_service() {
        let prober = HealthProber::new(Arc::new(Forwarder::new()));
        let dead = dead_url().await;
        let targets = vec![
            Arc::new(ServiceTarget {
                id: "a".to_string(),
                ..target(&dead)
            }),
            Arc::new(ServiceTarget {
                id: "b".to_string(),
                ..target(&dead)
            }),
        ];
        let results = prober.probe_all(&targets).await;
        assert_eq!(results.len(), 2);
        assert!(results.contains_key("a"));
        assert!(results.contains_key("b"));
    }

    #[tokio::test]
    async fn test_metrics_summary_unreachable_backend_is_error_shape() {
        let prober = HealthProber::new(Arc::new(Forwarder::new()));
        let summary = prober.metrics_summary(&target(&dead_url().await)).await;
        assert_eq!(summary["service"], "test");
        assert!(summary.get("error").is_some());
        assert!(summary.get("metrics").is_none());
        assert!(summary["timestamp"].as_f64().unwrap() > 0.0);
    }
}
