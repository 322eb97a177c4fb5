//! Integration tests for upstream ingestion.
//!
//! A loopback TCP listener stands in for the worker's feed and a loopback
//! UDP socket for its metrics sender.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::time::Duration;

use hud_core::{EventKind, Frame};
use hudd::hub::{spawn_hub, HubConfig, HubHandle, Subscription};
use hudd::ingest::{DatagramIngest, StreamIngest, StreamIngestConfig};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Test Helpers
// ============================================================================

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

async fn next(sub: &mut Subscription) -> Frame {
    timeout(RECV_TIMEOUT, sub.recv())
        .await
        .expect("frame within timeout")
        .expect("subscription open")
}

fn body(frame: &Frame) -> Value {
    serde_json::from_str(frame.data()).expect("frame is json")
}

/// Upstream listener plus a running ingester pointed at it.
struct Upstream {
    listener: TcpListener,
    hub: HubHandle,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Upstream {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let hub = spawn_hub(HubConfig::default(), cancel.clone());

        let config = StreamIngestConfig {
            reconnect_delay: Duration::from_millis(20),
            ..StreamIngestConfig::new(addr.to_string())
        };
        let task = tokio::spawn(StreamIngest::new(config, hub.clone(), cancel.clone()).run());

        Self {
            listener,
            hub,
            cancel,
            task,
        }
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        timeout(RECV_TIMEOUT, self.task)
            .await
            .expect("ingest stops on cancel")
            .unwrap();
    }
}

// ============================================================================
// Stream ingestion
// ============================================================================

#[tokio::test]
async fn test_malformed_line_becomes_console_and_ingestion_continues() {
    let upstream = Upstream::start().await;
    let mut sub = upstream.hub.attach().await.unwrap();

    let (mut conn, _) = upstream.listener.accept().await.unwrap();
    conn.write_all(b"not json\n{\"t\":\"reliable\",\"msg\":\"Phase -> Headers\",\"code\":0}\n")
        .await
        .unwrap();

    assert_eq!(next(&mut sub).await.kind(), EventKind::Clear);

    let raw = next(&mut sub).await;
    assert_eq!(raw.kind(), EventKind::Console);
    assert_eq!(body(&raw)["msg"], "not json");

    let reliable = next(&mut sub).await;
    assert_eq!(reliable.kind(), EventKind::Reliable);
    assert_eq!(body(&reliable)["code"], 0);

    upstream.shutdown().await;
}

#[tokio::test]
async fn test_reconnect_publishes_clear_before_new_data() {
    let upstream = Upstream::start().await;
    let mut sub = upstream.hub.attach().await.unwrap();

    let (mut first, _) = upstream.listener.accept().await.unwrap();
    first
        .write_all(b"{\"t\":\"console\",\"msg\":\"session one\"}\n")
        .await
        .unwrap();
    assert_eq!(next(&mut sub).await.kind(), EventKind::Clear);
    assert_eq!(body(&next(&mut sub).await)["msg"], "session one");

    // Simulated drop
    drop(first);

    let (mut second, _) = timeout(RECV_TIMEOUT, upstream.listener.accept())
        .await
        .expect("ingest reconnects")
        .unwrap();
    second
        .write_all(b"{\"t\":\"console\",\"msg\":\"session two\"}\n")
        .await
        .unwrap();

    assert_eq!(next(&mut sub).await.kind(), EventKind::Clear);
    assert_eq!(body(&next(&mut sub).await)["msg"], "session two");

    // The reset also emptied the replay for the old session
    let mut late = upstream.hub.attach().await.unwrap();
    assert_eq!(body(&next(&mut late).await)["msg"], "session two");

    upstream.shutdown().await;
}

#[tokio::test]
async fn test_trailing_record_without_newline_is_delivered_on_close() {
    let upstream = Upstream::start().await;
    let mut sub = upstream.hub.attach().await.unwrap();

    let (mut conn, _) = upstream.listener.accept().await.unwrap();
    conn.write_all(b"{\"t\":\"metrics\",\"peers\":3}").await.unwrap();
    conn.shutdown().await.unwrap();
    drop(conn);

    assert_eq!(next(&mut sub).await.kind(), EventKind::Clear);
    let metrics = next(&mut sub).await;
    assert_eq!(metrics.kind(), EventKind::Metrics);
    assert_eq!(body(&metrics)["peers"], 3);

    upstream.shutdown().await;
}

#[tokio::test]
async fn test_cancel_interrupts_reconnect_wait() {
    // Bind then drop so nothing listens there
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let cancel = CancellationToken::new();
    let hub = spawn_hub(HubConfig::default(), cancel.clone());
    let config = StreamIngestConfig {
        reconnect_delay: Duration::from_secs(3600),
        ..StreamIngestConfig::new(addr.to_string())
    };
    let task = tokio::spawn(StreamIngest::new(config, hub, cancel.clone()).run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    timeout(Duration::from_secs(2), task)
        .await
        .expect("cancellation does not wait out the reconnect delay")
        .unwrap();
}

// ============================================================================
// Datagram ingestion
// ============================================================================

#[tokio::test]
async fn test_metrics_datagrams_update_latest_slot() {
    let cancel = CancellationToken::new();
    let hub = spawn_hub(HubConfig::default(), cancel.clone());
    let mut sub = hub.attach().await.unwrap();

    let listener = DatagramIngest::bind("127.0.0.1:0", hub.clone(), cancel.clone())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(listener.run());

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(br#"{"headers":1}"#, addr).await.unwrap();
    sender.send_to(b"{broken", addr).await.unwrap();
    sender.send_to(br#"{"t":"console","msg":"x"}"#, addr).await.unwrap();
    sender
        .send_to(br#"{"t":"metrics","headers":2}"#, addr)
        .await
        .unwrap();

    let first = next(&mut sub).await;
    let second = next(&mut sub).await;
    assert_eq!(first.kind(), EventKind::Metrics);
    assert_eq!(body(&first)["headers"], 1);
    assert_eq!(body(&second)["headers"], 2);

    // Only the latest snapshot is replayed
    let mut late = hub.attach().await.unwrap();
    assert_eq!(body(&next(&mut late).await)["headers"], 2);
    hub.stats().await.unwrap();
    assert!(late.try_recv().is_none());

    cancel.cancel();
    task.await.unwrap();
}
