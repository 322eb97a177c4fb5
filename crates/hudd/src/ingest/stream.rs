//! Stream ingestion: TCP client for the worker's newline-delimited feed.
//!
//! Connection lifecycle:
//! 1. Connect to the upstream address
//! 2. Publish a `clear` event so dashboards drop the previous session
//! 3. Decode records with [`RecordCodec`] and publish each one, in order
//! 4. On EOF or error, wait the reconnect delay and start over
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()`.

use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hud_core::Event;
use hud_protocol::{RecordCodec, DEFAULT_MAX_LINE_LENGTH};

use super::IngestError;
use crate::hub::HubHandle;

/// Delay between a lost (or refused) connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Configuration for the stream ingester.
#[derive(Debug, Clone)]
pub struct StreamIngestConfig {
    /// Upstream `host:port`.
    pub addr: String,

    /// Fixed wait before every reconnect attempt.
    pub reconnect_delay: Duration,

    /// Lines longer than this are skipped.
    pub max_line_length: usize,
}

impl StreamIngestConfig {
    /// Creates a config for `addr` with default timings.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// TCP client that keeps the hub fed from the worker's stream.
pub struct StreamIngest {
    config: StreamIngestConfig,
    hub: HubHandle,
    cancel_token: CancellationToken,
}

impl StreamIngest {
    /// Creates a new stream ingester.
    pub fn new(config: StreamIngestConfig, hub: HubHandle, cancel_token: CancellationToken) -> Self {
        Self {
            config,
            hub,
            cancel_token,
        }
    }

    /// Main loop. Runs until cancelled or the hub shuts down.
    pub async fn run(self) {
        info!(addr = %self.config.addr, "Stream ingestion starting");

        let mut failures = 0u32;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                outcome = self.session() => outcome,
            };

            match outcome {
                Ok(()) => {
                    failures = 0;
                    info!(addr = %self.config.addr, "Upstream closed the stream");
                }
                Err(IngestError::Hub(e)) => {
                    info!(error = %e, "Hub unavailable, stopping stream ingestion");
                    break;
                }
                Err(e @ IngestError::Connect { .. }) => {
                    failures = failures.saturating_add(1);
                    // Only the first refusal of a streak is worth a warning
                    if failures == 1 {
                        warn!(error = %e, "Upstream not reachable, will keep retrying");
                    } else {
                        debug!(error = %e, attempt = failures, "Reconnect attempt failed");
                    }
                }
                Err(e) => {
                    failures = 0;
                    warn!(error = %e, "Upstream connection lost");
                }
            }

            tokio::select! {
                _ = self.cancel_token.cancelled() => break,
                _ = sleep(self.config.reconnect_delay) => {}
            }
        }

        info!("Stream ingestion stopped");
    }

    /// One connection: connect, reset, forward until EOF.
    async fn session(&self) -> Result<(), IngestError> {
        let stream = TcpStream::connect(&self.config.addr)
            .await
            .map_err(|source| IngestError::Connect {
                addr: self.config.addr.clone(),
                source,
            })?;

        info!(addr = %self.config.addr, "Connected to upstream");

        // Clear precedes any record of the new session
        self.hub.publish(Event::clear()).await?;

        let codec = RecordCodec::with_max_length(self.config.max_line_length);
        let mut records = FramedRead::new(stream, codec);
        let mut forwarded = 0u64;

        while let Some(result) = records.next().await {
            let event = result.map_err(IngestError::Read)?;
            self.hub.publish(event).await?;
            forwarded += 1;
        }

        debug!(forwarded, "Upstream session ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{spawn_hub, HubConfig};
    use hud_core::EventKind;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_config_defaults() {
        let config = StreamIngestConfig::new("127.0.0.1:8650");
        assert_eq!(config.reconnect_delay, Duration::from_millis(500));
        assert_eq!(config.max_line_length, DEFAULT_MAX_LINE_LENGTH);
    }

    #[tokio::test]
    async fn test_clear_then_records_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let hub = spawn_hub(HubConfig::default(), cancel.clone());
        let mut sub = hub.attach().await.unwrap();

        let ingest = StreamIngest::new(
            StreamIngestConfig::new(addr.to_string()),
            hub.clone(),
            cancel.clone(),
        );
        let task = tokio::spawn(ingest.run());

        let (mut upstream, _) = listener.accept().await.unwrap();
        upstream
            .write_all(b"{\"t\":\"console\",\"msg\":\"a\"}\nnot json\n")
            .await
            .unwrap();

        let kinds = [
            sub.recv().await.unwrap().kind(),
            sub.recv().await.unwrap().kind(),
            sub.recv().await.unwrap().kind(),
        ];
        assert_eq!(kinds, [EventKind::Clear, EventKind::Console, EventKind::Console]);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_while_unreachable() {
        // Nothing listens on this port once the listener is dropped
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let cancel = CancellationToken::new();
        let hub = spawn_hub(HubConfig::default(), cancel.clone());
        let ingest = StreamIngest::new(StreamIngestConfig::new(addr.to_string()), hub, cancel.clone());
        let task = tokio::spawn(ingest.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }
}
