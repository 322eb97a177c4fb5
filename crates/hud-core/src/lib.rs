//! HUD Core - Shared types for the Hornet telemetry relay
//!
//! This crate provides the event model and the bounded replay history shared
//! between the relay daemon (hudd) and the wire protocol crate.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod event;
pub mod pid;
pub mod replay;

// Re-exports for convenience
pub use error::{DomainError, DomainResult};
pub use event::{Event, EventKind, Frame, Payload};
pub use pid::WorkerPid;
pub use replay::{ReplayStore, DEFAULT_REPLAY_CAPACITY};
