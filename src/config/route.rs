//! Passthrough proxy route configuration

use serde::{Deserialize, Serialize};

/// What the client sees when a backend fails on this route.
///
/// Dashboard polling code often treats any non-2xx as a hard failure, so
/// probe-style endpoints shield the real status behind an HTTP 200 with an
/// embedded error object. True proxy routes propagate the backend status
/// for transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Always answer 200; errors are embedded in the JSON body
    Shield,
    /// Preserve the backend status code; transport failures map to 502/503
    Propagate,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::Propagate
    }
}

/// A prefix-routed passthrough proxy entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRouteConfig {
    /// Path prefix that selects this route (must start with `/`)
    pub prefix: String,

    /// Allow-listed service id the suffix is forwarded to
    pub service: String,

    /// Outbound call timeout — long enough for slow aggregation queries
    /// (default: `10s`)
    #[serde(default = "default_proxy_timeout")]
    pub timeout: String,

    /// Failure policy for this route (default: propagate)
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

pub(super) fn default_proxy_timeout() -> String {
    "10s".to_string()
}
