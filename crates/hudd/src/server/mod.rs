//! HTTP server for the relay.
//!
//! The server:
//! - Streams relayed events to dashboards over SSE (`/stream`)
//! - Exposes pause/resume and PID/status queries under `/api`
//! - Serves the dashboard page and its assets read-only
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   RelayServer   │
//! │  (axum Router)  │
//! └───────┬─────────┘
//!         │ GET /stream
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │SubscriberStream │◀────│    HubHandle    │
//! │  (per client)   │     │  attach/detach  │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Handler failures become HTTP responses, never task panics

mod assets;
mod routes;
mod stream;

pub use assets::{content_type_for, resolve_asset_path, INDEX_FILE};
pub use stream::{frame_to_sse, SubscriberStream};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::control::ProcessControl;
use crate::hub::HubHandle;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The HTTP address could not be bound. Fatal at startup.
    #[error("failed to bind HTTP server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    hub: HubHandle,
    control: ProcessControl,
    static_dir: Arc<PathBuf>,
    started_at: DateTime<Utc>,
    cancel_token: CancellationToken,
}

/// HTTP front end of the relay.
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    /// Creates a new server.
    ///
    /// # Arguments
    ///
    /// * `hub` - Handle to the fan-out hub
    /// * `control` - Pause/resume front end
    /// * `static_dir` - Directory holding the dashboard page and assets
    /// * `cancel_token` - Token for graceful shutdown; also ends open streams
    pub fn new(
        hub: HubHandle,
        control: ProcessControl,
        static_dir: impl Into<PathBuf>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            state: AppState {
                hub,
                control,
                static_dir: Arc::new(static_dir.into()),
                started_at: Utc::now(),
                cancel_token,
            },
        }
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(routes::index_handler))
            .route("/stream", get(routes::stream_handler))
            .route("/api/pause", post(routes::pause_handler))
            .route("/api/resume", post(routes::resume_handler))
            .route("/api/pid", get(routes::pid_handler))
            .route("/api/status", get(routes::status_handler))
            .route("/static/*path", get(routes::static_handler))
            .layer(middleware::map_response(routes::relay_headers))
            .with_state(self.state.clone())
    }

    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address is unavailable.
    pub async fn bind(self, addr: &str) -> Result<BoundServer, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(BoundServer {
            router: self.router(),
            listener,
            cancel_token: self.state.cancel_token,
        })
    }
}

/// A server whose socket is bound and ready to serve.
pub struct BoundServer {
    router: Router,
    listener: TcpListener,
    cancel_token: CancellationToken,
}

impl BoundServer {
    /// Returns the bound address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Serve` if the accept loop fails.
    pub async fn run(self) -> Result<(), ServerError> {
        if let Ok(addr) = self.listener.local_addr() {
            info!(addr = %addr, "HTTP server listening");
        }

        let cancel_token = self.cancel_token.clone();
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { cancel_token.cancelled().await })
            .await
            .map_err(ServerError::Serve)?;

        info!("HTTP server stopped");
        Ok(())
    }
}
