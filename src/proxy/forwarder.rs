//! Request forwarder — builds and issues the outbound backend call
//!
//! Copies inbound headers minus a fixed exclusion set, re-encodes the query
//! string without corrupting backend query grammar, and applies the route's
//! deadline to every call.

use super::{ProxyRequest, RawBackendResponse};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;
use thiserror::Error;

/// A classified outbound transport failure
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Upstream timed out after {0}ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    fn classify(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            return Self::Timeout(timeout.as_millis() as u64);
        }
        let detail = error_chain(&e);
        if e.is_connect() {
            if detail.to_lowercase().contains("refused") {
                Self::ConnectionRefused(detail)
            } else {
                Self::Network(detail)
            }
        } else {
            Self::Other(detail)
        }
    }
}

/// Flatten an error and its sources into one line
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

// Inbound headers never copied to the backend: connection management,
// CORS negotiation, and encoding are the gateway's own concern.
fn is_excluded_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "host"
            | "connection"
            | "content-length"
            | "access-control-request-method"
            | "access-control-request-headers"
            | "origin"
            | "referer"
            | "accept-encoding"
    )
}

// Query values keep the characters that are syntactically significant to a
// metrics-query grammar; everything else non-alphanumeric is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'(')
    .remove(b')')
    .remove(b'[')
    .remove(b']')
    .remove(b',')
    .remove(b'=');

const QUERY_KEY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Decode one percent-encoded query component (`+` means space)
pub fn decode_component(raw: &str) -> String {
    let plus_fixed = raw.replace('+', " ");
    percent_decode_str(&plus_fixed)
        .decode_utf8_lossy()
        .into_owned()
}

/// Percent-encode a query value, preserving `()[],=`
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Parse a raw query string into decoded key/value pairs.
/// Flag-style parameters (no `=`) decode to an empty value.
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(v)),
            None => (decode_component(part), String::new()),
        })
        .collect()
}

/// Re-encode a raw query string for retransmission.
///
/// The inbound string was percent-decoded during parsing; encoding it again
/// naively would double-escape characters the backend's query grammar needs
/// literally. Decode each pair, then re-encode with the grammar keep-set.
pub fn reencode_query(raw: &str) -> String {
    parse_query(raw)
        .into_iter()
        .map(|(k, v)| {
            let key = utf8_percent_encode(&k, QUERY_KEY).to_string();
            if v.is_empty() {
                key
            } else {
                format!("{}={}", key, encode_query_value(&v))
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Outbound HTTP client with per-call deadlines
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    /// Create a forwarder with a pooled client. Timeouts are per-call,
    /// taken from the route, never global.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Forward an inbound request to `base_url` + `path_suffix`.
    pub async fn forward(
        &self,
        req: &ProxyRequest,
        base_url: &str,
        path_suffix: &str,
        timeout: Duration,
    ) -> Result<RawBackendResponse, TransportError> {
        let mut url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path_suffix.trim_start_matches('/')
        );
        if let Some(query) = &req.query {
            let encoded = reencode_query(query);
            if !encoded.is_empty() {
                url.push('?');
                url.push_str(&encoded);
            }
        }

        let mut builder = self.client.request(req.method.clone(), &url).timeout(timeout);

        for (name, value) in req.headers.iter() {
            if !is_excluded_header(name.as_str()) {
                builder = builder.header(name.clone(), value.clone());
            }
        }

        // The normalizer never has to guess backend compression
        builder = builder
            .header(http::header::ACCEPT_ENCODING, "identity")
            .header(
                http::header::USER_AGENT,
                concat!("monitor-gateway/", env!("CARGO_PKG_VERSION")),
            );

        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::classify(e, timeout))?;

        self.collect(response, timeout).await
    }

    /// Issue a bare GET — used by health probes and the metrics/query API
    /// calls the gateway originates itself.
    pub async fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<RawBackendResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(http::header::ACCEPT_ENCODING, "identity")
            .send()
            .await
            .map_err(|e| TransportError::classify(e, timeout))?;

        self.collect(response, timeout).await
    }

    async fn collect(
        &self,
        response: reqwest::Response,
        timeout: Duration,
    ) -> Result<RawBackendResponse, TransportError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::classify(e, timeout))?;

        Ok(RawBackendResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}
