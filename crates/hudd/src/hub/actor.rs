//! Hub actor - owns the replay store and every subscriber queue.
//!
//! The HubActor is the single owner of relay state. Publishing, priming a new
//! subscriber, and removing one are all handled on this one task, so a
//! subscriber can never observe a frame twice or miss one between its replay
//! snapshot and its first live frame.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel send failures are logged but don't panic

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use hud_core::{Event, Frame, ReplayStore};

use super::commands::{HubCommand, HubStats, SubscriberId, Subscription};

/// The hub actor.
///
/// # Ownership
///
/// The actor owns:
/// - `store`: replay history (recent console/reliable frames plus latest metrics)
/// - `subscribers`: one bounded frame queue per attached client
///
/// # Delivery
///
/// Publishing never waits on a subscriber. A full queue drops the frame for
/// that subscriber only; a closed queue detaches it.
pub struct HubActor {
    /// Command receiver
    receiver: mpsc::Receiver<HubCommand>,

    /// Replay history
    store: ReplayStore,

    /// Subscriber queues keyed by ID
    subscribers: HashMap<SubscriberId, mpsc::Sender<Frame>>,

    /// Per-subscriber queue bound
    queue_capacity: usize,

    /// Next subscriber ID to hand out
    next_id: u64,

    /// Events published since start
    published: u64,

    /// Frames dropped on full subscriber queues since start
    dropped: u64,

    /// Stops the actor loop
    cancel_token: CancellationToken,
}

impl HubActor {
    /// Creates a new hub actor.
    ///
    /// The subscriber queue bound is raised to at least `replay_capacity + 1`
    /// so a full snapshot always fits in a fresh queue.
    pub fn new(
        receiver: mpsc::Receiver<HubCommand>,
        replay_capacity: usize,
        queue_capacity: usize,
        cancel_token: CancellationToken,
    ) -> Self {
        let store = ReplayStore::new(replay_capacity);
        let queue_capacity = queue_capacity.max(store.capacity() + 1);
        Self {
            receiver,
            store,
            subscribers: HashMap::new(),
            queue_capacity,
            next_id: 0,
            published: 0,
            dropped: 0,
            cancel_token,
        }
    }

    /// Runs the actor event loop until cancelled or every handle is dropped.
    ///
    /// On exit all subscriber queues are dropped, which ends every open push
    /// stream once it has drained.
    pub async fn run(mut self) {
        info!(
            replay_capacity = self.store.capacity(),
            queue_capacity = self.queue_capacity,
            "Hub actor starting"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    debug!("Hub shutdown requested");
                    break;
                }

                cmd = self.receiver.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => break,
                    }
                }
            }
        }

        info!(
            subscribers = self.subscribers.len(),
            published = self.published,
            dropped = self.dropped,
            "Hub actor stopped"
        );
        self.subscribers.clear();
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Publish { event } => self.handle_publish(event),
            HubCommand::Attach { respond_to } => {
                let subscription = self.handle_attach();
                let id = subscription.id();
                if respond_to.send(subscription).is_err() {
                    // Requester went away before receiving its queue
                    self.subscribers.remove(&id);
                }
            }
            HubCommand::Detach { id } => self.handle_detach(id),
            HubCommand::Stats { respond_to } => {
                let _ = respond_to.send(self.stats());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Records the event and offers it to every subscriber.
    fn handle_publish(&mut self, event: Event) {
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping event that failed to serialize");
                return;
            }
        };

        self.store.record(frame.clone());
        self.published += 1;

        let mut closed = Vec::new();
        for (id, queue) in &self.subscribers {
            match queue.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped += 1;
                    trace!(subscriber = %id, kind = %frame.kind(), "Subscriber queue full, frame dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            self.subscribers.remove(&id);
            debug!(subscriber = %id, remaining = self.subscribers.len(), "Subscriber gone, detached");
        }
    }

    /// Creates a subscriber queue pre-filled with the replay snapshot and
    /// registers it.
    fn handle_attach(&mut self) -> Subscription {
        let (queue, receiver) = mpsc::channel(self.queue_capacity);

        let snapshot = self.store.snapshot();
        let primed = snapshot.len();
        for frame in snapshot {
            // Cannot fill up: the queue is larger than any snapshot
            if queue.try_send(frame).is_err() {
                warn!("Replay snapshot did not fit in subscriber queue");
                break;
            }
        }

        let id = SubscriberId::new(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, queue);

        info!(
            subscriber = %id,
            primed,
            total_subscribers = self.subscribers.len(),
            "Subscriber attached"
        );

        Subscription::new(id, receiver)
    }

    /// Removes a subscriber. Unknown IDs are ignored.
    fn handle_detach(&mut self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            info!(
                subscriber = %id,
                total_subscribers = self.subscribers.len(),
                "Subscriber detached"
            );
        }
    }

    fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscribers.len(),
            buffered: self.store.len(),
            has_metrics: self.store.latest_metrics().is_some(),
            published: self.published,
            dropped: self.dropped,
        }
    }
}
