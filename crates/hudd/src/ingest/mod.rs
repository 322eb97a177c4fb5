//! Upstream ingestion.
//!
//! Two independent producers feed the hub:
//! - [`StreamIngest`]: a TCP client that reads newline-delimited records from
//!   the worker and reconnects forever
//! - [`DatagramIngest`]: a UDP listener for metrics snapshots
//!
//! Both stop promptly when the shared cancellation token fires.

mod datagram;
mod stream;

pub use datagram::{DatagramIngest, MAX_DATAGRAM_SIZE};
pub use stream::{StreamIngest, StreamIngestConfig, DEFAULT_RECONNECT_DELAY};

use thiserror::Error;

use crate::hub::HubError;

/// Errors raised while ingesting upstream data.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Could not connect to the upstream stream endpoint.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind the metrics datagram socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The upstream connection failed mid-read.
    #[error("upstream read failed: {0}")]
    Read(#[source] std::io::Error),

    /// The hub is gone; ingestion has nowhere to deliver events.
    #[error(transparent)]
    Hub(#[from] HubError),
}
