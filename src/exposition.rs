//! Exposition-format metrics text parsing
//!
//! Turns the line-oriented `name{labels} value` scrape format into a flat
//! `name → f64` mapping. Label blocks are discarded: the dashboard surfaces
//! only aggregate signal numbers, so later samples of the same name
//! overwrite earlier ones.

use std::collections::HashMap;

/// Parse exposition-format text into a flat metric mapping.
///
/// Blank lines and `#` comment/type lines are skipped. A line contributes a
/// sample only if its second whitespace token parses as a float; anything
/// else is skipped, never fatal.
pub fn parse(text: &str) -> HashMap<String, f64> {
    let mut metrics = HashMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let (name_token, value_token) = match (parts.next(), parts.next()) {
            (Some(n), Some(v)) => (n, v),
            _ => continue,
        };

        // Metric name is everything before the label block
        let name = match name_token.find('{') {
            Some(idx) => &name_token[..idx],
            None => name_token,
        };

        if let Ok(value) = value_token.parse::<f64>() {
            metrics.insert(name.to_string(), value);
        }
    }

    metrics
}
