//! Hornet HUD relay daemon.
//!
//! This crate provides the core infrastructure for the relay:
//! - `hub` - Fan-out actor owning the replay store and subscriber queues
//! - `ingest` - Upstream stream (TCP) and metrics (UDP) ingestion
//! - `discovery` - Worker PID resolution chain
//! - `control` - Pause/resume signalling of the worker
//! - `server` - HTTP server: SSE stream, control API, static assets
//! - `config` - Layered configuration
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          hudd daemon                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌───────────────┐   publish   ┌──────────────┐   frames         │
//! │  │ StreamIngest  │────────────▶│   HubActor   │──────────┐       │
//! │  │ (TCP client)  │             │ ReplayStore  │          ▼       │
//! │  └───────────────┘             │ subscribers  │  ┌──────────────┐│
//! │  ┌───────────────┐  try_publish│              │  │ RelayServer  ││
//! │  │DatagramIngest │────────────▶│              │  │ /stream (SSE)││
//! │  │ (UDP listener)│             └──────────────┘  │ /api/*       ││
//! │  └───────────────┘                               └──────┬───────┘│
//! │  ┌───────────────┐   watch<Option<WorkerPid>>           │        │
//! │  │ PID discovery │─────────────────────────────▶ ProcessControl  │
//! │  └───────────────┘                                               │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every task observes one `CancellationToken`; cancelling it stops
//! ingestion, discovery, the hub, open SSE streams and the HTTP server.
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod control;
pub mod discovery;
pub mod hub;
pub mod ingest;
pub mod server;
