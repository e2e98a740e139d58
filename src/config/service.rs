//! Service target configuration — the outbound allow-list entries

use serde::{Deserialize, Serialize};

/// A backend service the gateway is allowed to contact.
///
/// The id → url mapping is the security boundary: request paths select a
/// service by id, and only configured ids ever produce an outbound call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the backend (scheme + host + port, no trailing path)
    pub url: String,

    /// Path probed for liveness (default: `/actuator/health`)
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Path scraped for exposition-format metrics (default: `/actuator/prometheus`)
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Health probe timeout — short, so a dead backend cannot stall the
    /// dashboard (default: `2s`)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: String,

    /// Whether this service appears in the `/api/status` aggregate
    #[serde(default = "default_monitored")]
    pub monitored: bool,
}

fn default_health_path() -> String {
    "/actuator/health".to_string()
}

fn default_metrics_path() -> String {
    "/actuator/prometheus".to_string()
}

fn default_probe_timeout() -> String {
    "2s".to_string()
}

fn default_monitored() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            health_path: default_health_path(),
            metrics_path: default_metrics_path(),
            probe_timeout: default_probe_timeout(),
            monitored: default_monitored(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let svc = ServiceConfig::default();
        assert_eq!(svc.health_path, "/actuator/health");
        assert_eq!(svc.metrics_path, "/actuator/prometheus");
        assert_eq!(svc.probe_timeout, "2s");
        assert!(svc.monitored);
    }

    #[test]
    fn test_hcl_defaults_fill_in() {
        let svc: ServiceConfig = hcl::from_str(r#"url = "http://localhost:8080""#).unwrap();
        assert_eq!(svc.url, "http://localhost:8080");
        assert_eq!(svc.health_path, "/actuator/health");
        assert!(svc.monitored);
    }
}
