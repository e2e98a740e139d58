//! Route resolver — maps an inbound method/path to a backend target and a
//! handling mode
//!
//! The table is compiled once at startup and immutable afterwards. Matching
//! is prefix-based for passthrough proxies (longest prefix wins) with a
//! fixed set of aggregation API routes checked first. Service-id path
//! segments are only ever interpreted against the startup allow-list, never
//! used to build an outbound URL directly.

use crate::config::{parse_duration, FailurePolicy, GatewayConfig};
use crate::error::{GatewayError, Result};
use http::Method;
use std::time::Duration;

/// How a resolved request is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// Forward the remaining path suffix to an allow-listed service
    Passthrough {
        service: String,
        suffix: String,
        timeout: Duration,
        failure_policy: FailurePolicy,
    },
    /// Probe a single service's health endpoint
    HealthProbe { service: String },
    /// Health + metrics-scrape summary; service chosen by `?service=` param
    MetricsSummary,
    /// Aggregate health of every monitored service
    StatusAggregate,
    /// Synthetic demo log query
    DemoLogs,
    /// Prometheus instant (`range: false`) or range query
    PromQuery { range: bool },
    /// Prometheus backend liveness
    PromHealth,
}

struct CompiledProxy {
    prefix: String,
    service: String,
    timeout: Duration,
    failure_policy: FailurePolicy,
}

/// Compiled route table
pub struct RouteTable {
    proxies: Vec<CompiledProxy>,
}

impl RouteTable {
    /// Build the route table from configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let mut proxies: Vec<CompiledProxy> = Vec::new();

        for (name, proxy) in &config.proxies {
            if !proxy.prefix.starts_with('/') {
                return Err(GatewayError::Config(format!(
                    "Proxy route '{}' prefix '{}' must start with '/'",
                    name, proxy.prefix
                )));
            }
            proxies.push(CompiledProxy {
                prefix: proxy.prefix.clone(),
                service: proxy.service.clone(),
                timeout: parse_duration(&proxy.timeout),
                failure_policy: proxy.failure_policy,
            });
        }

        // Longest prefix wins when routes nest
        proxies.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Ok(Self { proxies })
    }

    /// Resolve a request to a handling mode. `None` means no route matched
    /// and the caller answers 404 (with CORS headers still attached).
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteKind> {
        // Aggregation API routes take precedence over passthrough prefixes
        match (method, path) {
            (&Method::GET, "/api/status") => return Some(RouteKind::StatusAggregate),
            (&Method::GET, "/api/metrics") => return Some(RouteKind::MetricsSummary),
            (&Method::GET, "/api/prometheus/health") => return Some(RouteKind::PromHealth),
            (&Method::GET | &Method::POST, "/api/prometheus/query") => {
                return Some(RouteKind::PromQuery { range: false })
            }
            (&Method::POST, "/api/prometheus/query_range") => {
                return Some(RouteKind::PromQuery { range: true })
            }
            (&Method::POST, "/api/query/logs") => return Some(RouteKind::DemoLogs),
            _ => {}
        }

        if method == Method::GET {
            if let Some(service) = path.strip_prefix("/api/health/") {
                if !service.is_empty() && !service.contains('/') {
                    return Some(RouteKind::HealthProbe {
                        service: service.to_string(),
                    });
                }
            }
        }

        for proxy in &self.proxies {
            if let Some(suffix) = path.strip_prefix(&proxy.prefix) {
                return Some(RouteKind::Passthrough {
                    service: proxy.service.clone(),
                    suffix: suffix.to_string(),
                    timeout: proxy.timeout,
                    failure_policy: proxy.failure_policy,
                });
            }
        }

        None
    }

    /// Number of compiled passthrough routes
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Whether the table has no passthrough routes
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}
