//! Payloads served by the relay's HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SSE comment written to every new stream before the replay snapshot.
pub const PRIMING_COMMENT: &str = "connected";

/// Result of a pause/resume request.
///
/// `error` is always present on the wire (`null` on success) so dashboards
/// can branch on it without probing for the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,
    pub error: Option<String>,
}

impl ControlResponse {
    /// A successful control response.
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    /// A failed control response carrying the error text.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// The currently resolved worker PID, or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidResponse {
    pub pid: Option<u32>,
}

/// Relay health summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Number of attached dashboard streams
    pub subscribers: usize,
    /// Console/reliable frames currently held for replay
    pub buffered: usize,
    /// Whether a metrics snapshot is held for replay
    pub has_metrics: bool,
    /// Frames published since startup
    pub published: u64,
    /// Frames not delivered because a subscriber queue was full
    pub dropped: u64,
    /// Resolved worker PID
    pub pid: Option<u32>,
    /// When the relay started
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_success_serializes_null_error() {
        let json = serde_json::to_string(&ControlResponse::success()).unwrap();
        assert_eq!(json, r#"{"ok":true,"error":null}"#);
    }

    #[test]
    fn test_control_failure() {
        let resp = ControlResponse::failure("process 42 not found");
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"ok":false,"error":"process 42 not found"}"#);
    }

    #[test]
    fn test_pid_response() {
        assert_eq!(
            serde_json::to_string(&PidResponse { pid: None }).unwrap(),
            r#"{"pid":null}"#
        );
        assert_eq!(
            serde_json::to_string(&PidResponse { pid: Some(4321) }).unwrap(),
            r#"{"pid":4321}"#
        );
    }

    #[test]
    fn test_status_roundtrip_fields() {
        let status = StatusResponse {
            subscribers: 2,
            buffered: 10,
            has_metrics: true,
            published: 99,
            dropped: 0,
            pid: None,
            started_at: Utc::now(),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["subscribers"], 2);
        assert_eq!(value["has_metrics"], true);
        assert!(value["started_at"].is_string());
    }
}
