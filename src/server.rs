//! HTTP entrypoint — listener, accept loop, and the per-request pipeline
//!
//! One task per connection, no shared mutable state beyond the immutable
//! route table and allow-list. Every request flows
//! resolve → forward → normalize; the failure synthesizer takes over on any
//! backend failure and the CORS envelope wraps whatever comes out, so a
//! well-formed response is always written.

use crate::config::{FailurePolicy, GatewayConfig};
use crate::cors;
use crate::demo::{DemoLogBackend, SyntheticBackend};
use crate::error::{GatewayError, Result};
use crate::failure;
use crate::observability::access_log::AccessLog;
use crate::observability::metrics::GatewayMetrics;
use crate::proxy::{normalize, Forwarder, ProxyRequest, ProxyResponse};
use crate::router::{RouteKind, RouteTable};
use crate::service::{HealthProber, ServiceMap, ServiceTarget};
use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Deadline for prometheus instant queries
const PROM_QUERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for prometheus range queries — these aggregate over time windows
const PROM_RANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared request-handling state, immutable after startup
pub struct GatewayState {
    pub route_table: RouteTable,
    pub services: ServiceMap,
    pub forwarder: Arc<Forwarder>,
    pub prober: HealthProber,
    pub demo_logs: Arc<dyn SyntheticBackend>,
    pub access_log: AccessLog,
    pub metrics: Arc<GatewayMetrics>,
    pub prometheus_service: String,
}

impl GatewayState {
    /// Build the complete handling state from configuration
    pub fn from_config(config: &GatewayConfig, metrics: Arc<GatewayMetrics>) -> Result<Self> {
        let route_table = RouteTable::from_config(config)?;
        let services = ServiceMap::from_config(config)?;
        let forwarder = Arc::new(Forwarder::new());

        Ok(Self {
            route_table,
            services,
            prober: HealthProber::new(forwarder.clone()),
            forwarder,
            demo_logs: Arc::new(DemoLogBackend::new()),
            access_log: AccessLog::new(),
            metrics,
            prometheus_service: config.prometheus_service.clone(),
        })
    }
}

/// Bind the listener. Failing to bind is one of the gateway's few fatal
/// errors.
pub async fn bind(address: &str) -> Result<TcpListener> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| GatewayError::Config(format!("Invalid listen address '{}': {}", address, e)))?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Other(format!("Failed to bind {}: {}", addr, e)))
}

/// Start the accept loop — one spawned task per connection.
///
/// Aborting the returned handle stops accepting; in-flight requests finish
/// on their own tasks, bounded by their outbound deadlines.
pub fn spawn_accept_loop(
    listener: TcpListener,
    state: Arc<GatewayState>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let (stream, remote_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            let state = state.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let _ = http1::Builder::new()
                    .serve_connection(
                        io,
                        service_fn(|req| handle_request(req, remote_addr, state.clone())),
                    )
                    .await;
            });
        }
    })
}

/// Handle an individual HTTP request. Never returns an error to hyper —
/// every failure becomes a synthesized response.
async fn handle_request(
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    state: Arc<GatewayState>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, hyper::Error> {
    state.metrics.inc_requests();
    let tracker = state.access_log.start_request();

    let (parts, body) = req.into_parts();
    let body_bytes = match BodyExt::collect(body).await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().map(|q| q.to_string());

    // Preflight short-circuits before routing so that any path, registered
    // or not, gets the full CORS header set
    if method == Method::OPTIONS {
        let response = cors::preflight_response();
        state.access_log.record(&tracker.build_entry(
            remote_addr.ip().to_string(),
            method.to_string(),
            path,
            response.status().as_u16(),
            0,
            Some("preflight".to_string()),
            None,
            false,
        ));
        return Ok(response);
    }

    let proxy_req = ProxyRequest {
        method: method.clone(),
        path: path.clone(),
        query,
        headers: parts.headers,
        body: body_bytes,
    };

    let outcome = match state.route_table.resolve(&proxy_req.method, &proxy_req.path) {
        Some(kind) => dispatch(kind, &proxy_req, &state).await,
        None => Outcome {
            response: failure::not_found(&proxy_req.path),
            route: "not-found",
            upstream: None,
            synthesized: true,
        },
    };

    if outcome.synthesized {
        state.metrics.inc_synthesized();
    }

    state.access_log.record(&tracker.build_entry(
        remote_addr.ip().to_string(),
        method.to_string(),
        path,
        outcome.response.status.as_u16(),
        outcome.response.body.len() as u64,
        Some(outcome.route.to_string()),
        outcome.upstream,
        outcome.synthesized,
    ));

    Ok(cors::finalize(outcome.response))
}

/// Result of dispatching one resolved route
struct Outcome {
    response: ProxyResponse,
    route: &'static str,
    upstream: Option<String>,
    synthesized: bool,
}

async fn dispatch(kind: RouteKind, req: &ProxyRequest, state: &GatewayState) -> Outcome {
    match kind {
        RouteKind::Passthrough {
            service,
            suffix,
            timeout,
            failure_policy,
        } => passthrough(req, state, &service, &suffix, timeout, failure_policy).await,
        RouteKind::HealthProbe { service } => health_probe(state, &service).await,
        RouteKind::MetricsSummary => metrics_summary(req, state).await,
        RouteKind::StatusAggregate => status_aggregate(state).await,
        RouteKind::DemoLogs => Outcome {
            response: state.demo_logs.respond(req).await,
            route: "demo-logs",
            upstream: None,
            synthesized: true,
        },
        RouteKind::PromQuery { range } => prom_query(req, state, range).await,
        RouteKind::PromHealth => prom_health(state).await,
    }
}

async fn passthrough(
    req: &ProxyRequest,
    state: &GatewayState,
    service: &str,
    suffix: &str,
    timeout: Duration,
    policy: FailurePolicy,
) -> Outcome {
    let target = match state.services.get(service) {
        Some(target) => target,
        None => {
            return Outcome {
                response: failure::unknown_service(service),
                route: "passthrough",
                upstream: None,
                synthesized: true,
            }
        }
    };

    match state
        .forwarder
        .forward(req, &target.base_url, suffix, timeout)
        .await
    {
        Ok(raw) => {
            // Shield routes mask backend application errors behind 200
            if policy == FailurePolicy::Shield && !raw.status.is_success() {
                let detail = String::from_utf8_lossy(&raw.body).to_string();
                return Outcome {
                    response: failure::backend_error(raw.status, &detail),
                    route: "passthrough",
                    upstream: Some(target.id.clone()),
                    synthesized: true,
                };
            }
            Outcome {
                response: normalize(raw),
                route: "passthrough",
                upstream: Some(target.id.clone()),
                synthesized: false,
            }
        }
        Err(e) => {
            state.metrics.inc_upstream_failures();
            tracing::warn!(service = target.id, error = %e, "Passthrough backend failed");
            Outcome {
                response: failure::transport_failure(&e, policy),
                route: "passthrough",
                upstream: Some(target.id.clone()),
                synthesized: true,
            }
        }
    }
}

async fn health_probe(state: &GatewayState, service: &str) -> Outcome {
    let target = match state.services.get(service) {
        Some(target) => target,
        None => {
            // Outside the allow-list: rejected before any outbound call
            return Outcome {
                response: failure::unknown_service(service),
                route: "health-probe",
                upstream: None,
                synthesized: true,
            };
        }
    };

    match state
        .forwarder
        .get(&target.health_url(), target.probe_timeout)
        .await
    {
        Ok(raw) if raw.status.is_success() => Outcome {
            response: normalize(raw),
            route: "health-probe",
            upstream: Some(target.id.clone()),
            synthesized: false,
        },
        Ok(raw) => Outcome {
            response: failure::health_down(&format!(
                "health endpoint returned {}",
                raw.status.as_u16()
            )),
            route: "health-probe",
            upstream: Some(target.id.clone()),
            synthesized: true,
        },
        Err(e) => {
            state.metrics.inc_upstream_failures();
            Outcome {
                response: failure::health_down(&e.to_string()),
                route: "health-probe",
                upstream: Some(target.id.clone()),
                synthesized: true,
            }
        }
    }
}

async fn metrics_summary(req: &ProxyRequest, state: &GatewayState) -> Outcome {
    let service = req
        .query
        .as_deref()
        .and_then(|raw| {
            crate::proxy::parse_query(raw)
                .into_iter()
                .find(|(k, _)| k == "service")
                .map(|(_, v)| v)
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "gateway".to_string());

    let target = match state.services.get(&service) {
        Some(target) => target,
        None => {
            return Outcome {
                response: failure::unknown_service(&service),
                route: "metrics-summary",
                upstream: None,
                synthesized: true,
            }
        }
    };

    let summary = state.prober.metrics_summary(&target).await;
    let synthesized = summary.get("error").is_some();
    if synthesized {
        state.metrics.inc_upstream_failures();
    }
    Outcome {
        response: ProxyResponse::json(StatusCode::OK, &summary),
        route: "metrics-summary",
        upstream: Some(target.id.clone()),
        synthesized,
    }
}

async fn status_aggregate(state: &GatewayState) -> Outcome {
    let targets = state.services.monitored();
    let results = state.prober.probe_all(&targets).await;
    let body = serde_json::to_value(&results).unwrap_or_default();
    Outcome {
        response: ProxyResponse::json(StatusCode::OK, &body),
        route: "status-aggregate",
        upstream: None,
        synthesized: false,
    }
}

async fn prom_query(req: &ProxyRequest, state: &GatewayState, range: bool) -> Outcome {
    let route: &'static str = if range { "prom-query-range" } else { "prom-query" };

    let target = match state.services.get(&state.prometheus_service) {
        Some(target) => target,
        None => {
            return Outcome {
                response: failure::unknown_service(&state.prometheus_service),
                route,
                upstream: None,
                synthesized: true,
            }
        }
    };

    let (url, timeout) = match build_prom_url(req, &target, range) {
        Ok(pair) => pair,
        Err(message) => {
            return Outcome {
                response: failure::bad_request(&message),
                route,
                upstream: Some(target.id.clone()),
                synthesized: true,
            }
        }
    };

    match state.forwarder.get(&url, timeout).await {
        Ok(raw) if raw.status.is_success() => Outcome {
            response: normalize(raw),
            route,
            upstream: Some(target.id.clone()),
            synthesized: false,
        },
        Ok(raw) => {
            let detail = String::from_utf8_lossy(&raw.body).to_string();
            Outcome {
                response: failure::backend_error(raw.status, &detail),
                route,
                upstream: Some(target.id.clone()),
                synthesized: true,
            }
        }
        Err(e) => {
            state.metrics.inc_upstream_failures();
            Outcome {
                response: failure::transport_failure(&e, FailurePolicy::Shield),
                route,
                upstream: Some(target.id.clone()),
                synthesized: true,
            }
        }
    }
}

/// Build the outbound prometheus API URL for an instant or range query.
/// Returns a client-facing error message when the query is missing.
fn build_prom_url(
    req: &ProxyRequest,
    target: &ServiceTarget,
    range: bool,
) -> std::result::Result<(String, Duration), String> {
    use crate::proxy::{encode_query_value, parse_query};

    let body: serde_json::Value = if req.method == Method::POST {
        serde_json::from_slice(&req.body).unwrap_or(serde_json::Value::Null)
    } else {
        serde_json::Value::Null
    };

    let query = if req.method == Method::GET {
        req.query
            .as_deref()
            .and_then(|raw| {
                parse_query(raw)
                    .into_iter()
                    .find(|(k, _)| k == "query")
                    .map(|(_, v)| v)
            })
            .unwrap_or_default()
    } else {
        body.get("query")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    if query.is_empty() {
        return Err("Missing query parameter".to_string());
    }

    if !range {
        return Ok((
            format!(
                "{}/api/v1/query?query={}",
                target.base_url,
                encode_query_value(&query)
            ),
            PROM_QUERY_TIMEOUT,
        ));
    }

    let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
    let start = epoch_f64(body.get("start")).unwrap_or(now - 3600.0);
    let end = epoch_f64(body.get("end")).unwrap_or(now);
    let step = body
        .get("step")
        .and_then(|v| v.as_str())
        .unwrap_or("15s")
        .to_string();

    Ok((
        format!(
            "{}/api/v1/query_range?query={}&start={}&end={}&step={}",
            target.base_url,
            encode_query_value(&query),
            start,
            end,
            encode_query_value(&step)
        ),
        PROM_RANGE_TIMEOUT,
    ))
}

/// Accept epoch timestamps as JSON numbers or numeric strings
fn epoch_f64(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

async fn prom_health(state: &GatewayState) -> Outcome {
    let target = match state.services.get(&state.prometheus_service) {
        Some(target) => target,
        None => {
            return Outcome {
                response: failure::unknown_service(&state.prometheus_service),
                route: "prom-health",
                upstream: None,
                synthesized: true,
            }
        }
    };

    match state
        .forwarder
        .get(&target.health_url(), target.probe_timeout)
        .await
    {
        Ok(raw) => {
            let status = if raw.status.is_success() { "UP" } else { "DOWN" };
            Outcome {
                response: ProxyResponse::json(
                    StatusCode::OK,
                    &serde_json::json!({ "status": status }),
                ),
                route: "prom-health",
                upstream: Some(target.id.clone()),
                synthesized: false,
            }
        }
        Err(e) => {
            state.metrics.inc_upstream_failures();
            Outcome {
                response: failure::health_down(&e.to_string()),
                route: "prom-health",
                upstream: Some(target.id.clone()),
                synthesized: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    fn get_request(path: &str, query: Option<&str>) -> ProxyRequest {
        ProxyRequest {
            method: Method::GET,
            path: path.to_string(),
            query: query.map(|q| q.to_string()),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    fn post_request(path: &str, body: &str) -> ProxyRequest {
        ProxyRequest {
            method: Method::POST,
            path: path.to_string(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    fn prom_target() -> ServiceTarget {
        ServiceTarget {
            id: "prometheus".to_string(),
            base_url: "http://localhost:9090".to_string(),
            health_path: "/-/healthy".to_string(),
            metrics_path: "/actuator/prometheus".to_string(),
            probe_timeout: Duration::from_secs(2),
            monitored: false,
        }
    }

    #[test]
    fn test_build_prom_url_from_get_query() {
        let raw = format!(
            "query={}",
            crate::proxy::encode_query_value("histogram_quantile(0.95, rate(x[5m]))")
        );
        let req = get_request("/api/prometheus/query", Some(&raw));
        let (url, timeout) = build_prom_url(&req, &prom_target(), false).unwrap();
        assert_eq!(
            url,
            "http://localhost:9090/api/v1/query?query=histogram_quantile(0.95,%20rate(x[5m]))"
        );
        assert_eq!(timeout, PROM_QUERY_TIMEOUT);
    }

    #[test]
    fn test_build_prom_url_from_post_body() {
        let req = post_request("/api/prometheus/query", r#"{"query": "up"}"#);
        let (url, _) = build_prom_url(&req, &prom_target(), false).unwrap();
        assert_eq!(url, "http://localhost:9090/api/v1/query?query=up");
    }

    #[test]
    fn test_build_prom_url_missing_query() {
        let req = get_request("/api/prometheus/query", None);
        assert!(build_prom_url(&req, &prom_target(), false).is_err());

        let req = post_request("/api/prometheus/query", "{}");
        assert!(build_prom_url(&req, &prom_target(), false).is_err());
    }

    #[test]
    fn test_build_prom_range_url_defaults() {
        let req = post_request("/api/prometheus/query_range", r#"{"query": "up"}"#);
        let (url, timeout) = build_prom_url(&req, &prom_target(), true).unwrap();
        assert!(url.starts_with("http://localhost:9090/api/v1/query_range?query=up&start="));
        assert!(url.contains("&step=15s"));
        assert_eq!(timeout, PROM_RANGE_TIMEOUT);
    }

    #[test]
    fn test_build_prom_range_url_explicit_window() {
        let req = post_request(
            "/api/prometheus/query_range",
            r#"{"query": "up", "start": 1000, "end": "2000", "step": "1m"}"#,
        );
        let (url, _) = build_prom_url(&req, &prom_target(), true).unwrap();
        assert!(url.contains("&start=1000&end=2000&step=1m"));
    }

    #[test]
    fn test_epoch_f64_accepts_numbers_and_strings() {
        assert_eq!(epoch_f64(Some(&serde_json::json!(12.5))), Some(12.5));
        assert_eq!(epoch_f64(Some(&serde_json::json!("12.5"))), Some(12.5));
        assert_eq!(epoch_f64(Some(&serde_json::json!(null))), None);
        assert_eq!(epoch_f64(None), None);
    }
}
