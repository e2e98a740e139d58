//! Gateway request counters
//!
//! Lock-free atomics, readable as a consistent-enough snapshot for the
//! health endpoint and tests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Gateway-wide counters
pub struct GatewayMetrics {
    total_requests: AtomicU64,
    synthesized_responses: AtomicU64,
    upstream_failures: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub synthesized_responses: u64,
    pub upstream_failures: u64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            synthesized_responses: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_synthesized(&self) {
        self.synthesized_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_upstream_failures(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            synthesized_responses: self.synthesized_responses.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
