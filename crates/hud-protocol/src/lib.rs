//! HUD Protocol - Wire formats for the Hornet telemetry relay
//!
//! This crate provides parsing for the two upstream feeds emitted by the
//! worker (newline-delimited JSON over a stream, JSON datagrams) and the
//! payload types served to dashboards by the relay's HTTP API.

pub mod api;
pub mod codec;
pub mod datagram;
pub mod record;

pub use api::{ControlResponse, PidResponse, StatusResponse, PRIMING_COMMENT};
pub use codec::{RecordCodec, DEFAULT_MAX_LINE_LENGTH};
pub use datagram::{parse_metrics_datagram, DatagramError};
pub use record::classify_line;
