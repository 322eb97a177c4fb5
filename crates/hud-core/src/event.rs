//! Relay event model.
//!
//! An [`Event`] is what ingestion produces: a closed [`EventKind`] tag plus an
//! opaque JSON mapping that is forwarded verbatim. Before an event is stored or
//! fanned out it is serialized exactly once into a [`Frame`], which is cheap to
//! clone and never re-parsed downstream.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// Structured event payload, preserved verbatim for forwarding.
pub type Payload = serde_json::Map<String, Value>;

// ============================================================================
// Event Kind
// ============================================================================

/// The kind of a relayed event.
///
/// Doubles as the SSE `event:` name on the push endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Worker console output (one log line)
    Console,
    /// Structured event the dashboard should never miss
    Reliable,
    /// Periodic numeric snapshot; only the latest one matters
    Metrics,
    /// Session reset: dashboards discard everything they hold
    Clear,
}

impl EventKind {
    /// Maps an upstream `t` tag to a kind.
    ///
    /// Anything unrecognized is treated as console output. `Clear` is never
    /// produced from an upstream tag; it is raised by the relay itself.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "reliable" => Self::Reliable,
            "metrics" => Self::Metrics,
            _ => Self::Console,
        }
    }

    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Reliable => "reliable",
            Self::Metrics => "metrics",
            Self::Clear => "clear",
        }
    }

    /// Whether frames of this kind are kept in the replay buffer.
    pub fn is_buffered(&self) -> bool {
        matches!(self, Self::Console | Self::Reliable)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event
// ============================================================================

/// An immutable relayed event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: EventKind,
    payload: Payload,
}

impl Event {
    /// Creates an event from a kind and payload.
    pub fn new(kind: EventKind, payload: Payload) -> Self {
        Self { kind, payload }
    }

    /// Creates a console event carrying a single `msg` field.
    ///
    /// Used for raw upstream lines that could not be classified.
    pub fn console(msg: impl Into<String>) -> Self {
        let mut payload = Payload::new();
        payload.insert("msg".to_string(), Value::String(msg.into()));
        Self::new(EventKind::Console, payload)
    }

    /// Creates the session-reset event.
    pub fn clear() -> Self {
        Self::new(EventKind::Clear, Payload::new())
    }

    /// Returns the event kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the `msg` field, if the payload has a string one.
    pub fn message(&self) -> Option<&str> {
        self.payload.get("msg").and_then(Value::as_str)
    }

    /// Serializes the payload into a frame.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialize` if the payload cannot be encoded.
    pub fn to_frame(&self) -> DomainResult<Frame> {
        let data = serde_json::to_string(&self.payload).map_err(|e| DomainError::Serialize {
            kind: self.kind,
            reason: e.to_string(),
        })?;
        Ok(Frame::new(self.kind, data))
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A pre-serialized event, shared between the replay buffer and every
/// subscriber queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: EventKind,
    data: Arc<str>,
}

impl Frame {
    /// Creates a frame from an already-encoded JSON body.
    pub fn new(kind: EventKind, data: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    /// Returns the kind of the event this frame carries.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the compact JSON body.
    pub fn data(&self) -> &str {
        &self.data
    }
}
