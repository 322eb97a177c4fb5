//! Hornet HUD relay daemon
//!
//! Relays the worker's telemetry feed to browser dashboards over SSE and
//! exposes pause/resume of the worker process.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (upstream 127.0.0.1:8650, metrics 127.0.0.1:9999, HTTP 127.0.0.1:8645)
//! hudd
//!
//! # Pin the worker PID and serve on all interfaces
//! hudd --pid 4321 --http-addr 0.0.0.0:8645
//!
//! # Use a config file
//! hudd --config ./hud.toml
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hud_core::WorkerPid;
use hudd::config::RelayConfig;
use hudd::control::ProcessControl;
use hudd::discovery::{pid_channel, spawn_discovery, PidResolver};
use hudd::hub::spawn_hub;
use hudd::ingest::{DatagramIngest, StreamIngest};
use hudd::server::RelayServer;

/// Hornet HUD relay - telemetry fan-out and worker control
#[derive(Parser, Debug)]
#[command(name = "hudd", version, about)]
struct Args {
    /// Config file (TOML). Defaults to <config_dir>/hornet-hud/config.toml if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Upstream worker feed (host:port)
    #[arg(long)]
    stream_addr: Option<String>,

    /// Metrics datagram bind address (host:port)
    #[arg(long)]
    metrics_addr: Option<String>,

    /// HTTP bind address (host:port)
    #[arg(long)]
    http_addr: Option<String>,

    /// Worker PID; disables process scanning
    #[arg(long)]
    pid: Option<WorkerPid>,

    /// File holding the worker PID
    #[arg(long)]
    pidfile: Option<PathBuf>,

    /// Substring identifying the worker in the process table
    #[arg(long)]
    marker: Option<String>,

    /// Directory holding live_status.html and its assets
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut RelayConfig) {
        if let Some(addr) = self.stream_addr {
            config.stream_addr = addr;
        }
        if let Some(addr) = self.metrics_addr {
            config.metrics_addr = addr;
        }
        if let Some(addr) = self.http_addr {
            config.http_addr = addr;
        }
        if let Some(pid) = self.pid {
            config.pid = Some(pid);
        }
        if let Some(path) = self.pidfile {
            config.pidfile = Some(path);
        }
        if let Some(marker) = self.marker {
            config.process_marker = marker;
        }
        if let Some(dir) = self.static_dir {
            config.static_dir = dir;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hudd=info".parse()?)
                .add_directive("hud_core=info".parse()?)
                .add_directive("hud_protocol=info".parse()?),
        )
        .init();

    let mut config =
        RelayConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    run_relay(config)
}

#[tokio::main]
async fn run_relay(config: RelayConfig) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "[HUD] stream tcp://{}  metrics udp://{}  http://{}",
        config.stream_addr,
        config.metrics_addr,
        config.http_addr,
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let hub = spawn_hub(config.hub(), cancel_token.clone());

    let (pid_publisher, pid_watch) = pid_channel();
    let resolver = PidResolver::standard(config.pid, config.pidfile.clone(), &config.process_marker);
    let discovery = spawn_discovery(
        resolver,
        pid_publisher,
        config.pid_refresh(),
        cancel_token.clone(),
    );

    let stream_ingest = tokio::spawn(
        StreamIngest::new(config.stream_ingest(), hub.clone(), cancel_token.clone()).run(),
    );

    let datagram_ingest =
        match DatagramIngest::bind(&config.metrics_addr, hub.clone(), cancel_token.clone()).await {
            Ok(listener) => Some(tokio::spawn(listener.run())),
            Err(e) => {
                warn!(error = %e, "Metrics listener unavailable, metrics disabled");
                None
            }
        };

    let server = RelayServer::new(
        hub,
        ProcessControl::new(pid_watch),
        config.static_dir.clone(),
        cancel_token.clone(),
    );

    let result = match server.bind(&config.http_addr).await {
        Ok(bound) => bound.run().await.context("HTTP server failed"),
        Err(e) => Err(e).context("Cannot serve dashboards"),
    };

    // Either shutdown was requested or the server could not run
    cancel_token.cancel();
    let _ = stream_ingest.await;
    if let Some(task) = datagram_ingest {
        let _ = task.await;
    }
    let _ = discovery.await;

    match &result {
        Ok(()) => info!("Relay stopped"),
        Err(e) => error!(error = %format!("{e:#}"), "Relay stopped with error"),
    }
    result
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
