//! Hub actor commands, errors, and subscription types.
//!
//! This module defines the message types for communicating with the `HubActor`:
//! - `HubCommand`: Commands sent to the actor
//! - `HubError`: Errors that can occur when talking to the hub
//! - `Subscription`: A primed, registered subscriber queue handed to a client
//!
//! All types are designed for async message passing and follow the panic-free policy.

use std::fmt;

use hud_core::{Event, Frame};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Hub Commands
// ============================================================================

/// Commands sent to the hub actor.
#[derive(Debug)]
pub enum HubCommand {
    /// Record an event in the replay store and fan it out to every subscriber.
    Publish {
        /// The event to publish
        event: Event,
    },

    /// Create a subscriber primed with the current replay snapshot.
    ///
    /// Priming and registration happen in the same actor turn, so the new
    /// subscriber sees every stored frame exactly once and every later
    /// publish after them.
    Attach {
        /// Channel to send the new subscription
        respond_to: oneshot::Sender<Subscription>,
    },

    /// Remove a subscriber. Removing an unknown subscriber is a no-op.
    Detach {
        /// ID of the subscriber to remove
        id: SubscriberId,
    },

    /// Report hub counters.
    Stats {
        /// Channel to send the result
        respond_to: oneshot::Sender<HubStats>,
    },
}

// ============================================================================
// Hub Errors
// ============================================================================

/// Errors that can occur when sending commands to the hub.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The hub actor has stopped.
    #[error("hub channel closed")]
    ChannelClosed,

    /// The hub command queue is full (only returned by non-waiting sends).
    #[error("hub command queue is full")]
    Full,
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Identifier the hub uses to key a subscriber queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A registered subscriber: the receiving end of its bounded frame queue.
///
/// The queue already holds the replay snapshot when this is handed out.
/// Dropping the subscription closes the queue; the hub notices on its next
/// publish and forgets the subscriber.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, receiver: mpsc::Receiver<Frame>) -> Self {
        Self { id, receiver }
    }

    /// Returns the subscriber ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next frame. Returns `None` once the hub has dropped
    /// this subscriber (detach or shutdown) and the queue is drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Returns a frame if one is queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }

    /// Mutable access to the underlying queue, for polling from a `Stream`.
    pub fn receiver_mut(&mut self) -> &mut mpsc::Receiver<Frame> {
        &mut self.receiver
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Point-in-time hub counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Registered subscribers
    pub subscribers: usize,
    /// Console/reliable frames held for replay
    pub buffered: usize,
    /// Whether a metrics frame is held for replay
    pub has_metrics: bool,
    /// Events published since the hub started
    pub published: u64,
    /// Frames dropped because a subscriber queue was full
    pub dropped: u64,
}
