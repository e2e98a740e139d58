//! Proxy data model — the request/response shapes that flow through the
//! gateway pipeline
//!
//! A `ProxyRequest` is built once per inbound connection. The forwarder
//! turns it into a `RawBackendResponse`, the normalizer (or the failure
//! synthesizer) turns that into a `ProxyResponse`, and the CORS envelope
//! consumes the `ProxyResponse` exactly once when writing the reply.

mod forwarder;
mod normalizer;

pub use forwarder::{
    decode_component, encode_query_value, parse_query, reencode_query, Forwarder, TransportError,
};
pub use normalizer::normalize;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

/// An inbound request, decoupled from the server library's types
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Decoded request path (no query string)
    pub path: String,
    /// Raw query string as received, if any
    pub query: Option<String>,
    /// Inbound headers — ordered, case-insensitive keys, duplicates preserved
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A backend response before normalization
#[derive(Debug)]
pub struct RawBackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The gateway's reply, ready for the CORS envelope
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    /// Normalized content type, always present
    pub content_type: String,
    /// Additional headers to forward (beyond content type and CORS)
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    /// Build a JSON response from a serializable value
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json; charset=utf-8".to_string(),
            headers: HeaderMap::new(),
            body: Bytes::from(serde_json::to_vec(value).unwrap_or_default()),
        }
    }
}
