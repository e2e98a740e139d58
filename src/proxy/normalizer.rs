//! Response normalizer — decompresses, transcodes, and content-type-corrects
//! backend payloads
//!
//! Every fallback here is best-effort: a malformed body degrades the
//! normalization, never the request.

use super::{ProxyResponse, RawBackendResponse};
use bytes::Bytes;
use flate2::read::GzDecoder;
use http::HeaderMap;
use std::io::Read;

/// Normalize a raw backend response into the gateway's reply shape.
///
/// Steps, in order: gzip decompression (declared encoding only), UTF-8
/// decode with Latin-1 retry, JSON validation to canonicalize the content
/// type. A stale `Content-Encoding` header never survives this function —
/// the output carries only the normalized content type.
pub fn normalize(raw: RawBackendResponse) -> ProxyResponse {
    let declared_type = raw
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = decompress_if_gzip(&raw.headers, raw.body);

    // Bodies that cannot be meaningful text pass through untouched
    if is_opaque_binary(&declared_type, &body) {
        let content_type = if declared_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            declared_type
        };
        return ProxyResponse {
            status: raw.status,
            content_type,
            headers: HeaderMap::new(),
            body,
        };
    }

    match std::str::from_utf8(&body) {
        Ok(text) => {
            let content_type = canonical_content_type(&declared_type, text);
            ProxyResponse {
                status: raw.status,
                content_type,
                headers: HeaderMap::new(),
                body,
            }
        }
        Err(_) => {
            // Latin-1 maps every byte to a code point, so this re-encode
            // always succeeds
            tracing::debug!("Backend body is not UTF-8, transcoding from Latin-1");
            let transcoded: String = body.iter().map(|&b| b as char).collect();
            let content_type = canonical_content_type(&declared_type, &transcoded);
            ProxyResponse {
                status: raw.status,
                content_type,
                headers: HeaderMap::new(),
                body: Bytes::from(transcoded),
            }
        }
    }
}

/// Decompress the body when the backend declared gzip. Decompression
/// failure falls back to the raw bytes.
fn decompress_if_gzip(headers: &HeaderMap, body: Bytes) -> Bytes {
    let declared_gzip = headers
        .get(http::header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase().contains("gzip"))
        .unwrap_or(false);

    if !declared_gzip {
        return body;
    }

    let mut decoded = Vec::new();
    match GzDecoder::new(body.as_ref()).read_to_end(&mut decoded) {
        Ok(_) => Bytes::from(decoded),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decompress gzip body, passing raw bytes");
            body
        }
    }
}

/// A payload is opaque when its declared type is a known binary family or
/// the bytes contain NUL (not meaningful in any text encoding we handle).
fn is_opaque_binary(declared_type: &str, body: &[u8]) -> bool {
    let ct = declared_type.to_lowercase();
    let binary_type = ct.starts_with("image/")
        || ct.starts_with("audio/")
        || ct.starts_with("video/")
        || ct.starts_with("font/")
        || ct.starts_with("application/octet-stream")
        || ct.starts_with("application/pdf");
    binary_type || body.contains(&0u8)
}

/// JSON validation corrects the declared type, never the body.
fn canonical_content_type(declared: &str, text: &str) -> String {
    let lower = declared.to_lowercase();
    if lower.contains("json") || declared.is_empty() {
        if serde_json::from_str::<serde_json::Value>(text).is_ok() {
            return "application/json; charset=utf-8".to_string();
        }
        if declared.is_empty() {
            return "text/plain; charset=utf-8".to_string();
        }
    }
    declared.to_string()
}
