//! Service layer — the outbound allow-list and health probing
//!
//! Every outbound call the gateway makes targets a `ServiceTarget` resolved
//! from this map by logical id. Request data selects ids, never URLs.

mod probe;

pub use probe::{HealthProber, HealthResult, HealthState};

use crate::config::{parse_duration, GatewayConfig};
use crate::error::{GatewayError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A resolved backend target from the allow-list
#[derive(Debug, Clone)]
pub struct ServiceTarget {
    pub id: String,
    /// Base URL without trailing slash
    pub base_url: String,
    pub health_path: String,
    pub metrics_path: String,
    pub probe_timeout: Duration,
    pub monitored: bool,
}

impl ServiceTarget {
    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, self.health_path)
    }

    pub fn metrics_url(&self) -> String {
        format!("{}{}", self.base_url, self.metrics_path)
    }
}

/// Immutable id → target registry built once at startup
pub struct ServiceMap {
    services: HashMap<String, Arc<ServiceTarget>>,
}

impl ServiceMap {
    /// Build the service map from configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let mut services = HashMap::new();

        for (id, svc) in &config.services {
            if svc.url.is_empty() {
                return Err(GatewayError::Config(format!(
                    "Service '{}' has an empty url",
                    id
                )));
            }
            services.insert(
                id.clone(),
                Arc::new(ServiceTarget {
                    id: id.clone(),
                    base_url: svc.url.trim_end_matches('/').to_string(),
                    health_path: svc.health_path.clone(),
                    metrics_path: svc.metrics_path.clone(),
                    probe_timeout: parse_duration(&svc.probe_timeout),
                    monitored: svc.monitored,
                }),
            );
        }

        Ok(Self { services })
    }

    /// Look up a target by id. `None` means the id is outside the allow-list.
    pub fn get(&self, id: &str) -> Option<Arc<ServiceTarget>> {
        self.services.get(id).cloned()
    }

    /// All targets that participate in the `/api/status` aggregate,
    /// in stable id order.
    pub fn monitored(&self) -> Vec<Arc<ServiceTarget>> {
        let mut targets: Vec<_> = self
            .services
            .values()
            .filter(|t| t.monitored)
            .cloned()
            .collect();
        targets.sort_by(|a, b| a.id.cmp(&b.id));
        targets
    }

    /// Number of registered services
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the map is empty
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
