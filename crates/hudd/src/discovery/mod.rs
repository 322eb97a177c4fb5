//! Worker PID discovery.
//!
//! Resolves which process pause/resume should signal. Sources are tried in
//! order and the first hit wins:
//!
//! 1. explicit override (`HORNET_PID` / `--pid`)
//! 2. pidfile (`HORNET_PIDFILE` / `--pidfile`)
//! 3. process-table scan for the marker
//! 4. `pgrep -f <marker>`
//!
//! If one of the fixed sources (1, 2) answers at startup, the PID is set once
//! and never rescanned. Otherwise the scanning sources run on a fixed interval
//! and the shared PID changes only when a scan finds a different process.
//! A PID that stops matching is kept; signalling it reports `TargetNotFound`.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Discovery errors are logged but never fatal

mod sources;

pub use sources::{ExplicitPid, PgrepScan, PidFile, ProcessTableScan};

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use hud_core::WorkerPid;

/// Default interval between process scans.
pub const DEFAULT_PID_REFRESH: Duration = Duration::from_secs(5);

/// Default process marker.
pub const DEFAULT_PROCESS_MARKER: &str = "hornetnode";

/// Read side of the shared worker PID.
pub type PidWatch = watch::Receiver<Option<WorkerPid>>;

/// Write side of the shared worker PID. Owned by the discovery task only.
pub type PidPublisher = watch::Sender<Option<WorkerPid>>;

/// Creates the shared PID cell, initially unresolved.
pub fn pid_channel() -> (PidPublisher, PidWatch) {
    watch::channel(None)
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors a PID source can report. Never fatal; the resolver logs them and
/// moves on to the next source.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The pidfile could not be read or did not hold a valid PID
    #[error("pidfile {path}: {message}")]
    PidFile { path: PathBuf, message: String },

    /// The process-table scan failed
    #[error("process scan failed: {0}")]
    Scan(String),

    /// `pgrep` could not be run
    #[error("pgrep failed: {0}")]
    Pgrep(String),
}

// ============================================================================
// Sources
// ============================================================================

/// A way of finding the worker PID.
#[async_trait]
pub trait PidSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Returns the PID this source currently points at, if any.
    async fn resolve(&self) -> Result<Option<WorkerPid>, DiscoveryError>;
}

/// Ordered discovery chain.
#[derive(Default)]
pub struct PidResolver {
    fixed: Vec<Box<dyn PidSource>>,
    scanners: Vec<Box<dyn PidSource>>,
}

impl PidResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the standard chain.
    pub fn standard(
        pid_override: Option<WorkerPid>,
        pidfile: Option<PathBuf>,
        marker: &str,
    ) -> Self {
        let mut resolver = Self::new();
        if let Some(pid) = pid_override {
            resolver = resolver.with_fixed(ExplicitPid(pid));
        }
        if let Some(path) = pidfile {
            resolver = resolver.with_fixed(PidFile::new(path));
        }
        resolver
            .with_scanner(ProcessTableScan::new(marker))
            .with_scanner(PgrepScan::new(marker))
    }

    /// Appends a source consulted once at startup.
    pub fn with_fixed(mut self, source: impl PidSource + 'static) -> Self {
        self.fixed.push(Box::new(source));
        self
    }

    /// Appends a source consulted on every scan.
    pub fn with_scanner(mut self, source: impl PidSource + 'static) -> Self {
        self.scanners.push(Box::new(source));
        self
    }

    /// Tries the fixed sources in order.
    pub async fn resolve_fixed(&self) -> Option<(WorkerPid, &'static str)> {
        first_hit(&self.fixed).await
    }

    /// Tries the scanning sources in order.
    pub async fn scan(&self) -> Option<(WorkerPid, &'static str)> {
        first_hit(&self.scanners).await
    }
}

async fn first_hit(sources: &[Box<dyn PidSource>]) -> Option<(WorkerPid, &'static str)> {
    for source in sources {
        match source.resolve().await {
            Ok(Some(pid)) => return Some((pid, source.name())),
            Ok(None) => {}
            Err(e) => debug!(source = source.name(), error = %e, "PID source failed"),
        }
    }
    None
}

// ============================================================================
// Discovery task
// ============================================================================

/// Spawns the discovery task.
///
/// Returns after one attempt if a fixed source answers; otherwise scans every
/// `refresh` until cancelled.
pub fn spawn_discovery(
    resolver: PidResolver,
    publisher: PidPublisher,
    refresh: Duration,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_discovery(resolver, publisher, refresh, cancel_token))
}

async fn run_discovery(
    resolver: PidResolver,
    publisher: PidPublisher,
    refresh: Duration,
    cancel_token: CancellationToken,
) {
    if let Some((pid, source)) = resolver.resolve_fixed().await {
        publisher.send_replace(Some(pid));
        info!(pid = %pid, source, "Worker PID set, periodic scan disabled");
        return;
    }

    info!(interval_secs = refresh.as_secs_f64(), "Worker PID discovery scanning");

    let mut ticker = interval(refresh.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let found = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            found = resolver.scan() => found,
        };

        if let Some((pid, source)) = found {
            let changed = publisher.send_if_modified(|current| {
                if *current == Some(pid) {
                    false
                } else {
                    *current = Some(pid);
                    true
                }
            });
            if changed {
                info!(pid = %pid, source, "Worker PID auto-detected");
            }
        }
    }

    debug!("PID discovery stopped");
}
