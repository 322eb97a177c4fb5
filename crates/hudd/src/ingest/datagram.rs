//! Datagram ingestion: UDP listener for metrics snapshots.
//!
//! Each datagram carries one JSON object. Malformed datagrams are dropped
//! silently (at debug level); valid ones are published as metrics events
//! without ever waiting on the hub.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use hud_protocol::parse_metrics_datagram;

use super::IngestError;
use crate::hub::{HubError, HubHandle};

/// Receive buffer size; large enough for any UDP payload.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// UDP listener publishing metrics into the hub.
pub struct DatagramIngest {
    socket: UdpSocket,
    hub: HubHandle,
    cancel_token: CancellationToken,
}

impl DatagramIngest {
    /// Binds the metrics socket.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Bind` if the address cannot be bound. Callers
    /// treat this as non-fatal: the relay runs on without metrics.
    pub async fn bind(
        addr: &str,
        hub: HubHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, IngestError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| IngestError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            socket,
            hub,
            cancel_token,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive loop. Runs until cancelled or the hub shuts down.
    pub async fn run(self) {
        if let Ok(addr) = self.socket.local_addr() {
            info!(addr = %addr, "Metrics listener started");
        }

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };

            let (len, peer) = match received {
                Ok(received) => received,
                Err(e) => {
                    // e.g. ICMP port unreachable surfaced on some platforms
                    debug!(error = %e, "Metrics receive failed");
                    continue;
                }
            };

            let Some(bytes) = buf.get(..len) else {
                continue;
            };

            let event = match parse_metrics_datagram(bytes) {
                Ok(event) => event,
                Err(e) => {
                    debug!(peer = %peer, len, error = %e, "Dropping malformed metrics datagram");
                    continue;
                }
            };

            match self.hub.try_publish(event) {
                Ok(()) => trace!(peer = %peer, len, "Metrics datagram published"),
                Err(HubError::Full) => debug!("Hub busy, metrics datagram dropped"),
                Err(HubError::ChannelClosed) => {
                    warn!("Hub unavailable, stopping metrics listener");
                    break;
                }
            }
        }

        info!("Metrics listener stopped");
    }
}
