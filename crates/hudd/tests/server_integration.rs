//! Integration tests for the HTTP server.
//!
//! These tests verify the RelayServer works correctly as a complete system:
//! SSE framing and priming, the control API, and static assets.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::net::SocketAddr;
use std::time::Duration;

use hud_core::{Event, EventKind, WorkerPid};
use hud_protocol::{ControlResponse, PidResponse, StatusResponse};
use hudd::control::ProcessControl;
use hudd::discovery::{pid_channel, PidPublisher};
use hudd::hub::{spawn_hub, HubConfig, HubHandle};
use hudd::server::RelayServer;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for expected bytes on an SSE connection
const READ_TIMEOUT: Duration = Duration::from_secs(3);

// ============================================================================
// Test Helpers
// ============================================================================

/// Test server context that manages server lifecycle and cleanup.
struct TestServer {
    addr: SocketAddr,
    hub: HubHandle,
    pid: PidPublisher,
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
    static_dir: TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        let static_dir = tempfile::tempdir().expect("create temp dir");
        let cancel_token = CancellationToken::new();
        let hub = spawn_hub(HubConfig::default(), cancel_token.clone());
        let (pid, pid_watch) = pid_channel();

        let server = RelayServer::new(
            hub.clone(),
            ProcessControl::new(pid_watch),
            static_dir.path(),
            cancel_token.clone(),
        );
        let bound = server.bind("127.0.0.1:0").await.expect("bind loopback");
        let addr = bound.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let _ = bound.run().await;
        });

        Self {
            addr,
            hub,
            pid,
            cancel_token,
            task,
            static_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn shutdown(self) {
        self.cancel_token.cancel();
        timeout(READ_TIMEOUT, self.task)
            .await
            .expect("server stops on cancel")
            .unwrap();
    }
}

fn event(kind: EventKind, value: Value) -> Event {
    let Value::Object(map) = value else {
        panic!("expected object");
    };
    Event::new(kind, map)
}

/// Opens a raw SSE connection and returns it after sending the request.
async fn open_stream(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /stream HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n")
        .await
        .unwrap();
    stream
}

/// Reads until `needle` has appeared in the accumulated text.
async fn read_until(stream: &mut TcpStream, seen: &mut String, needle: &str) {
    timeout(READ_TIMEOUT, async {
        let mut buf = [0u8; 4096];
        while !seen.contains(needle) {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "stream closed before {needle:?} arrived");
            seen.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}; got {seen:?}"));
}

// ============================================================================
// SSE stream
// ============================================================================

#[tokio::test]
async fn test_stream_primes_with_comment_and_snapshot_then_live() {
    let server = TestServer::spawn().await;
    server
        .hub
        .publish(event(EventKind::Console, json!({"msg": "one"})))
        .await
        .unwrap();
    server
        .hub
        .publish(event(EventKind::Reliable, json!({"code": 0, "t": "reliable"})))
        .await
        .unwrap();

    let mut stream = open_stream(server.addr).await;
    let mut seen = String::new();

    let e1 = "event: console\ndata: {\"msg\":\"one\"}\n\n";
    let e2 = "event: reliable\ndata: {\"code\":0,\"t\":\"reliable\"}\n\n";
    read_until(&mut stream, &mut seen, e2).await;

    let lower = seen.to_ascii_lowercase();
    assert!(lower.starts_with("http/1.1 200"));
    assert!(lower.contains("content-type: text/event-stream"));
    assert!(lower.contains("access-control-allow-origin: *"));
    assert!(lower.contains("cache-control: no-cache"));

    let priming = seen.find(": connected\n\n").expect("priming comment");
    let first = seen.find(e1).expect("first replayed frame");
    let second = seen.find(e2).expect("second replayed frame");
    assert!(priming < first && first < second);

    server
        .hub
        .publish(event(EventKind::Console, json!({"msg": "three"})))
        .await
        .unwrap();
    let e3 = "event: console\ndata: {\"msg\":\"three\"}\n\n";
    read_until(&mut stream, &mut seen, e3).await;
    assert_eq!(seen.matches(e1).count(), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_clear_frame_on_the_wire() {
    let server = TestServer::spawn().await;
    let mut stream = open_stream(server.addr).await;
    let mut seen = String::new();
    read_until(&mut stream, &mut seen, ": connected\n\n").await;

    server.hub.publish(Event::clear()).await.unwrap();
    read_until(&mut stream, &mut seen, "event: clear\ndata: {}\n\n").await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_detaches_subscriber() {
    let server = TestServer::spawn().await;

    let mut stream = open_stream(server.addr).await;
    let mut seen = String::new();
    read_until(&mut stream, &mut seen, ": connected\n\n").await;
    assert_eq!(server.hub.stats().await.unwrap().subscribers, 1);

    drop(stream);

    timeout(READ_TIMEOUT, async {
        loop {
            // Publishing also reaps a closed queue if the detach raced
            server.hub.publish(Event::console("tick")).await.unwrap();
            if server.hub.stats().await.unwrap().subscribers == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscriber detached after disconnect");

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let server = TestServer::spawn().await;
    let mut stream = open_stream(server.addr).await;
    let mut seen = String::new();
    read_until(&mut stream, &mut seen, ": connected\n\n").await;

    server.shutdown().await;

    // The response body terminates; the connection reaches EOF
    let mut rest = Vec::new();
    timeout(READ_TIMEOUT, stream.read_to_end(&mut rest))
        .await
        .expect("stream closed after shutdown")
        .unwrap();
}

// ============================================================================
// Control API
// ============================================================================

#[tokio::test]
async fn test_pause_and_resume_without_pid() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/api/pause", "/api/resume"] {
        let resp = client.post(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: ControlResponse = resp.json().await.unwrap();
        assert!(!body.ok);
        assert!(body.error.unwrap().contains("HORNET_PID"));
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_pid_endpoint_follows_discovery() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let raw: Value = client
        .get(server.url("/api/pid"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(raw, json!({"pid": null}));

    server.pid.send_replace(Some(WorkerPid::new(4321).unwrap()));
    let body: PidResponse = client
        .get(server.url("/api/pid"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.pid, Some(4321));

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_pause_and_resume_real_process() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    server.pid.send_replace(Some(WorkerPid::new(child.id()).unwrap()));

    let paused: ControlResponse = client
        .post(server.url("/api/pause"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(paused, ControlResponse::success());

    let resumed: ControlResponse = client
        .post(server.url("/api/resume"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resumed, ControlResponse::success());

    child.kill().unwrap();
    child.wait().unwrap();

    // The PID now names nothing
    let gone: ControlResponse = client
        .post(server.url("/api/pause"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!gone.ok);
    assert!(gone.error.unwrap().contains("not found"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_status_endpoint() {
    let server = TestServer::spawn().await;
    server.hub.publish(Event::console("a")).await.unwrap();
    server
        .hub
        .publish(event(EventKind::Metrics, json!({"peers": 1})))
        .await
        .unwrap();

    let status: StatusResponse = reqwest::get(server.url("/api/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status.buffered, 1);
    assert!(status.has_metrics);
    assert_eq!(status.published, 2);
    assert_eq!(status.dropped, 0);
    assert_eq!(status.subscribers, 0);
    assert_eq!(status.pid, None);

    server.shutdown().await;
}

// ============================================================================
// Static assets
// ============================================================================

#[tokio::test]
async fn test_index_and_static_assets() {
    let server = TestServer::spawn().await;
    let dir = server.static_dir.path();
    std::fs::write(dir.join("live_status.html"), "<title>HUD</title>").unwrap();
    std::fs::create_dir(dir.join("img")).unwrap();
    std::fs::write(dir.join("img").join("bee.png"), [0x89u8, b'P', b'N', b'G']).unwrap();

    let index = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(index.status(), 200);
    assert_eq!(
        index.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    assert_eq!(index.text().await.unwrap(), "<title>HUD</title>");

    let image = reqwest::get(server.url("/static/img/bee.png")).await.unwrap();
    assert_eq!(image.status(), 200);
    assert_eq!(image.headers()["content-type"], "image/png");
    assert_eq!(image.bytes().await.unwrap().len(), 4);

    let missing = reqwest::get(server.url("/static/nope.css")).await.unwrap();
    assert_eq!(missing.status(), 404);

    let escape = reqwest::get(server.url("/static/%2e%2e/secret.txt")).await.unwrap();
    assert_eq!(escape.status(), 404);

    server.shutdown().await;
}
