//! Client interface for interacting with the HubActor.
//!
//! The `HubHandle` provides a cheap-to-clone interface for publishing events
//! and managing subscribers.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `HubError::ChannelClosed`

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use hud_core::Event;

use super::commands::{HubCommand, HubError, HubStats, SubscriberId, Subscription};

/// Handle for interacting with the hub actor.
///
/// ```ignore
/// let hub = spawn_hub(HubConfig::default(), cancel.clone());
/// hub.publish(Event::console("hello")).await?;
///
/// let mut sub = hub.attach().await?;
/// while let Some(frame) = sub.recv().await {
///     // forward frame
/// }
/// ```
#[derive(Clone)]
pub struct HubHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Create a new hub handle.
    pub fn new(sender: mpsc::Sender<HubCommand>) -> Self {
        Self { sender }
    }

    /// Publishes an event, waiting for room in the command queue.
    ///
    /// # Errors
    ///
    /// - `HubError::ChannelClosed` if the actor has shut down
    pub async fn publish(&self, event: Event) -> Result<(), HubError> {
        self.sender
            .send(HubCommand::Publish { event })
            .await
            .map_err(|_| HubError::ChannelClosed)
    }

    /// Publishes an event without waiting.
    ///
    /// # Errors
    ///
    /// - `HubError::Full` if the command queue is full (the event is dropped)
    /// - `HubError::ChannelClosed` if the actor has shut down
    pub fn try_publish(&self, event: Event) -> Result<(), HubError> {
        self.sender
            .try_send(HubCommand::Publish { event })
            .map_err(|e| match e {
                TrySendError::Full(_) => HubError::Full,
                TrySendError::Closed(_) => HubError::ChannelClosed,
            })
    }

    /// Attaches a new subscriber, primed with the current replay snapshot.
    ///
    /// # Errors
    ///
    /// - `HubError::ChannelClosed` if the actor has shut down
    pub async fn attach(&self) -> Result<Subscription, HubError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(HubCommand::Attach { respond_to: tx })
            .await
            .map_err(|_| HubError::ChannelClosed)?;

        rx.await.map_err(|_| HubError::ChannelClosed)
    }

    /// Requests removal of a subscriber without waiting.
    ///
    /// Safe to call from `Drop`. If the command queue is full the request is
    /// skipped; the hub still detaches the subscriber on its next publish
    /// once the receiving side is gone.
    pub fn detach(&self, id: SubscriberId) {
        if let Err(e) = self.sender.try_send(HubCommand::Detach { id }) {
            debug!(subscriber = %id, error = %e, "Detach request not delivered");
        }
    }

    /// Returns hub counters.
    ///
    /// # Errors
    ///
    /// - `HubError::ChannelClosed` if the actor has shut down
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(HubCommand::Stats { respond_to: tx })
            .await
            .map_err(|_| HubError::ChannelClosed)?;

        rx.await.map_err(|_| HubError::ChannelClosed)
    }

    /// Returns true while the actor is still accepting commands.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
