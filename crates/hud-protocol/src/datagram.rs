//! Parsing of upstream metrics datagrams.
//!
//! Every datagram is one self-contained JSON object. There is no framing and
//! no acknowledgement; a datagram that does not parse is simply dropped by
//! the caller.

use hud_core::{Event, EventKind};
use serde_json::Value;
use thiserror::Error;

/// Reasons a metrics datagram is rejected.
#[derive(Debug, Error)]
pub enum DatagramError {
    /// The datagram is not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The datagram is valid JSON but not an object
    #[error("datagram is not a JSON object")]
    NotAnObject,

    /// The datagram carries a type tag other than `metrics`
    #[error("unexpected type tag: {0}")]
    UnexpectedTag(String),
}

/// Parses a datagram into a metrics event.
///
/// Objects tagged `"t": "metrics"` are accepted. Untagged objects are
/// accepted too, which is looser than a tag-only filter: anything arriving
/// on the metrics socket without a `t` field is treated as metrics. Any
/// other tag is rejected.
///
/// # Errors
///
/// See [`DatagramError`].
pub fn parse_metrics_datagram(bytes: &[u8]) -> Result<Event, DatagramError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Object(map) = value else {
        return Err(DatagramError::NotAnObject);
    };

    match map.get("t") {
        None => {}
        Some(Value::String(tag)) if tag == "metrics" => {}
        Some(other) => {
            let tag = other.as_str().map_or_else(|| other.to_string(), str::to_string);
            return Err(DatagramError::UnexpectedTag(tag));
        }
    }

    Ok(Event::new(EventKind::Metrics, map))
}
