//! Configuration types for the monitoring gateway
//!
//! Built once at startup into an immutable value that is passed explicitly
//! to every component — request handling never reads ambient environment
//! state. Uses HCL (HashiCorp Configuration Language) as the configuration
//! format.

mod route;
mod service;

pub use route::{FailurePolicy, ProxyRouteConfig};
pub use service::ServiceConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Top-level gateway configuration
///
/// # HCL Example
///
/// ```hcl
/// listen_address = "0.0.0.0:8083"
///
/// services "prometheus" {
///   url         = "http://localhost:9090"
///   health_path = "/-/healthy"
/// }
///
/// proxies "prometheus" {
///   prefix  = "/prometheus/"
///   service = "prometheus"
///   timeout = "10s"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address the gateway listens on
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Service allow-list: logical id → backend target.
    /// Only ids present here may ever be contacted.
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,

    /// Passthrough proxy routes: name → prefix/service/timeout
    #[serde(default)]
    pub proxies: HashMap<String, ProxyRouteConfig>,

    /// Service id backing the `/api/prometheus/*` query endpoints
    #[serde(default = "default_prometheus_service")]
    pub prometheus_service: String,

    /// Graceful shutdown timeout in seconds (default: 30)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_listen_address() -> String {
    "0.0.0.0:8083".to_string()
}

fn default_prometheus_service() -> String {
    "prometheus".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl GatewayConfig {
    /// Load configuration from an HCL file.
    ///
    /// The file must contain valid HCL content regardless of extension.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            GatewayError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_hcl(&content)
    }

    /// Parse configuration from an HCL string
    pub fn from_hcl(content: &str) -> Result<Self> {
        hcl::from_str(content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse HCL config: {}", e)))
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        // Every proxy route must reference an allow-listed service
        for (name, proxy) in &self.proxies {
            if !self.services.contains_key(&proxy.service) {
                return Err(GatewayError::Config(format!(
                    "Proxy route '{}' references unknown service '{}'",
                    name, proxy.service
                )));
            }
            if !proxy.prefix.starts_with('/') {
                return Err(GatewayError::Config(format!(
                    "Proxy route '{}' prefix '{}' must start with '/'",
                    name, proxy.prefix
                )));
            }
        }

        // The prometheus query endpoints need their backing service
        if !self.services.contains_key(&self.prometheus_service) {
            return Err(GatewayError::Config(format!(
                "prometheus_service '{}' is not a configured service",
                self.prometheus_service
            )));
        }

        for (id, svc) in &self.services {
            if svc.url.is_empty() {
                return Err(GatewayError::Config(format!(
                    "Service '{}' has an empty url",
                    id
                )));
            }
        }

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut services = HashMap::new();
        services.insert(
            "prometheus".to_string(),
            ServiceConfig {
                url: "http://localhost:9090".to_string(),
                health_path: "/-/healthy".to_string(),
                monitored: false,
                ..ServiceConfig::default()
            },
        );
        services.insert(
            "grafana".to_string(),
            ServiceConfig {
                url: "http://localhost:3000".to_string(),
                health_path: "/api/health".to_string(),
                monitored: false,
                ..ServiceConfig::default()
            },
        );
        services.insert(
            "registry".to_string(),
            ServiceConfig {
                url: "http://localhost:8081".to_string(),
                monitored: false,
                ..ServiceConfig::default()
            },
        );
        services.insert(
            "gateway".to_string(),
            ServiceConfig {
                url: "http://localhost:8080".to_string(),
                ..ServiceConfig::default()
            },
        );
        services.insert(
            "producer".to_string(),
            ServiceConfig {
                url: "http://localhost:8081".to_string(),
                ..ServiceConfig::default()
            },
        );
        services.insert(
            "consumer".to_string(),
            ServiceConfig {
                url: "http://localhost:8082".to_string(),
                ..ServiceConfig::default()
            },
        );

        let mut proxies = HashMap::new();
        for name in ["prometheus", "grafana", "registry", "gateway"] {
            proxies.insert(
                name.to_string(),
                ProxyRouteConfig {
                    prefix: format!("/{}/", name),
                    service: name.to_string(),
                    timeout: route::default_proxy_timeout(),
                    failure_policy: FailurePolicy::Propagate,
                },
            );
        }

        Self {
            listen_address: default_listen_address(),
            services,
            proxies,
            prometheus_service: default_prometheus_service(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

/// Parse a duration string like "10s", "500ms", "1m"
pub(crate) fn parse_duration(s: &str) -> Duration {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        Duration::from_millis(ms.parse().unwrap_or(1000))
    } else if let Some(secs) = s.strip_suffix('s') {
        Duration::from_secs(secs.parse().unwrap_or(10))
    } else if let Some(mins) = s.strip_suffix('m') {
        Duration::from_secs(mins.parse::<u64>().unwrap_or(1) * 60)
    } else {
        Duration::from_secs(s.parse().unwrap_or(10))
    }
}
