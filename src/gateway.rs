//! Gateway orchestrator — high-level coordinator for all gateway components
//!
//! Ties together configuration, the route table, the service allow-list,
//! the listener, and observability into a single manageable unit.

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::observability::metrics::GatewayMetrics;
use crate::server;
use crate::{GatewayState, HealthStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main Gateway — coordinates all components
pub struct Gateway {
    /// Immutable configuration, built once at startup
    config: GatewayConfig,
    /// Gateway runtime state
    state: Arc<RwLock<GatewayState>>,
    /// Start time
    start_time: Instant,
    /// Shutdown flag
    shutdown: Arc<AtomicBool>,
    /// Request counters
    metrics: Arc<GatewayMetrics>,
    /// Active listener task handles
    handles: RwLock<Vec<tokio::task::JoinHandle<()>>>,
}

impl Gateway {
    /// Create a new gateway from configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(GatewayState::Created)),
            start_time: Instant::now(),
            shutdown: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(GatewayMetrics::new()),
            handles: RwLock::new(Vec::new()),
        })
    }

    /// Start the gateway — binds the listener and begins accepting
    /// connections
    pub async fn start(&self) -> Result<()> {
        self.set_state(GatewayState::Starting);

        let state = server::GatewayState::from_config(&self.config, self.metrics.clone())?;
        tracing::info!(
            proxy_routes = state.route_table.len(),
            services = state.services.len(),
            "Route table compiled"
        );

        let listener = server::bind(&self.config.listen_address).await?;
        tracing::info!(address = %self.config.listen_address, "Gateway listening");

        let handle = server::spawn_accept_loop(listener, Arc::new(state));
        self.handles.write().unwrap().push(handle);

        self.set_state(GatewayState::Running);
        tracing::info!("Gateway is running");

        Ok(())
    }

    /// Initiate graceful shutdown: stop accepting, let in-flight requests
    /// finish on their own tasks (bounded by their outbound deadlines)
    pub async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return; // Already shutting down
        }

        self.set_state(GatewayState::Stopping);
        tracing::info!("Gateway shutting down");

        let mut handles = self.handles.write().unwrap();
        for handle in handles.drain(..) {
            handle.abort();
        }

        self.set_state(GatewayState::Stopped);
        tracing::info!("Gateway stopped");
    }

    /// Wait for a shutdown signal (Ctrl+C)
    pub async fn wait_for_shutdown(&self) {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        self.shutdown().await;
    }

    /// Get the current gateway state
    pub fn state(&self) -> GatewayState {
        self.state.read().unwrap().clone()
    }

    /// Get a health status snapshot
    pub fn health(&self) -> HealthStatus {
        let snapshot = self.metrics.snapshot();
        HealthStatus {
            state: self.state(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            total_requests: snapshot.total_requests,
            synthesized_responses: snapshot.synthesized_responses,
        }
    }

    /// Get the request counters
    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    /// Get the configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Check if the gateway is running
    pub fn is_running(&self) -> bool {
        self.state() == GatewayState::Running
    }

    /// Check if shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn set_state(&self, new_state: GatewayState) {
        let mut state = self.state.write().unwrap();
        tracing::debug!(from = %*state, to = %new_state, "State transition");
        *state = new_state;
    }
}
