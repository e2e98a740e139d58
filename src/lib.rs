//! # Monitor Gateway
//!
//! A monitoring aggregation gateway: a single HTTP-facing process between a
//! browser dashboard and several independent backend services (health
//! endpoints, exposition-format metrics endpoints, query/demo APIs), none
//! of which expose browser-safe CORS headers or a unified response shape.
//!
//! ## Architecture
//!
//! ```text
//! Listener → Route Resolver → Request Forwarder → Response Normalizer
//!                                   ↓ (on failure)
//!                           Failure Synthesizer
//!                                   ↓
//!                             CORS Envelope → response written
//! ```
//!
//! ## Core Features
//!
//! - **Prefix Routing**: startup-compiled table mapping path prefixes and
//!   aggregation API routes to allow-listed backend services
//! - **Response Normalization**: gzip decompression, UTF-8/Latin-1
//!   transcoding, JSON content-type canonicalization
//! - **Failure Containment**: every backend failure becomes structured JSON
//!   the dashboard can render; per-route shield/propagate policy
//! - **Health Aggregation**: concurrent multi-service probes with one entry
//!   per configured backend, always
//! - **CORS Envelope**: uniform cross-origin headers on every response,
//!   preflight included
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use monitor_gateway::{config::GatewayConfig, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> monitor_gateway::Result<()> {
//!     let config = GatewayConfig::from_file("gateway.hcl").await?;
//!     let gateway = Gateway::new(config)?;
//!     gateway.start().await?;
//!     gateway.wait_for_shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub(crate) mod cors;
pub(crate) mod demo;
pub mod error;
pub mod exposition;
pub(crate) mod failure;
pub mod gateway;
pub(crate) mod observability;
pub(crate) mod proxy;
pub(crate) mod router;
pub(crate) mod server;
pub(crate) mod service;

// Re-export main types
pub use error::{GatewayError, Result};
pub use gateway::Gateway;

use serde::{Deserialize, Serialize};

/// Gateway runtime state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GatewayState {
    /// Gateway has been created but not yet started
    #[default]
    Created,
    /// Gateway is compiling the route table and binding the listener
    Starting,
    /// Gateway is actively accepting and proxying requests
    Running,
    /// Gateway is draining connections and shutting down
    Stopping,
    /// Gateway has fully stopped
    Stopped,
}

impl std::fmt::Display for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Gateway health status snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Current gateway state
    pub state: GatewayState,
    /// Uptime in seconds since gateway started
    pub uptime_secs: u64,
    /// Total requests handled since start
    pub total_requests: u64,
    /// Responses produced by the failure synthesizer or demo backend
    pub synthesized_responses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_state_default() {
        assert_eq!(GatewayState::default(), GatewayState::Created);
    }

    #[test]
    fn test_gateway_state_display() {
        assert_eq!(GatewayState::Created.to_string(), "created");
        assert_eq!(GatewayState::Starting.to_string(), "starting");
        assert_eq!(GatewayState::Running.to_string(), "running");
        assert_eq!(GatewayState::Stopping.to_string(), "stopping");
        assert_eq!(GatewayState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_gateway_state_serialization() {
        let state = GatewayState::Running;
        let json = serde_json::to_string(&state).unwrap();
        let parsed: GatewayState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, GatewayState::Running);
    }

    #[test]
    fn test_health_status_default() {
        let health = HealthStatus::default();
        assert_eq!(health.state, GatewayState::Created);
        assert_eq!(health.uptime_secs, 0);
        assert_eq!(health.total_requests, 0);
        assert_eq!(health.synthesized_responses, 0);
    }

    #[test]
    fn test_health_status_serialization() {
        let health = HealthStatus {
            state: GatewayState::Running,
            uptime_secs: 3600,
            total_requests: 10000,
            synthesized_responses: 12,
        };
        let json = serde_json::to_string(&health).unwrap();
        let parsed: HealthStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.state, GatewayState::Running);
        assert_eq!(parsed.total_requests, 10000);
        assert_eq!(parsed.synthesized_responses, 12);
    }
}
