//! Fan-out hub using the Actor pattern.
//!
//! The hub is the central state manager of the relay. Ingestion tasks publish
//! events into it; push clients attach to it and receive frames.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │  StreamIngest   │────▶│    HubActor     │────▶│ subscriber queue │──▶ SSE client
//! └─────────────────┘     │                 │     └──────────────────┘
//! ┌─────────────────┐     │  ReplayStore    │     ┌──────────────────┐
//! │ DatagramIngest  │────▶│  subscribers    │────▶│ subscriber queue │──▶ SSE client
//! └─────────────────┘     └─────────────────┘     └──────────────────┘
//!         HubCommand (mpsc)          Frame (bounded mpsc, try_send)
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod actor;
mod commands;
mod handle;

pub use actor::HubActor;
pub use commands::{HubCommand, HubError, HubStats, SubscriberId, Subscription};
pub use handle::HubHandle;

/// Default per-subscriber queue bound.
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 1024;

/// Command channel buffer size
const COMMAND_BUFFER: usize = 1024;

/// Sizing for the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Console/reliable frames kept for replay
    pub replay_capacity: usize,
    /// Frames a subscriber may have queued before new ones are dropped
    pub subscriber_queue: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            replay_capacity: hud_core::DEFAULT_REPLAY_CAPACITY,
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
        }
    }
}

/// Spawn the hub actor and return a handle for interaction.
///
/// The actor stops when `cancel_token` is cancelled or every handle is
/// dropped.
///
/// ```no_run
/// use hudd::hub::{spawn_hub, HubConfig};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() {
///     let hub = spawn_hub(HubConfig::default(), CancellationToken::new());
///     let stats = hub.stats().await;
/// }
/// ```
pub fn spawn_hub(config: HubConfig, cancel_token: CancellationToken) -> HubHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = HubActor::new(
        cmd_rx,
        config.replay_capacity,
        config.subscriber_queue,
        cancel_token,
    );
    tokio::spawn(actor.run());

    HubHandle::new(cmd_tx)
}
