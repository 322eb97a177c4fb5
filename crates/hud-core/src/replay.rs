//! Bounded replay history.
//!
//! The [`ReplayStore`] holds the most recent console/reliable frames plus the
//! single latest metrics frame, so a dashboard attaching mid-session can be
//! primed with recent history before it starts receiving live events.
//!
//! The store is a plain owned value. Callers serialize access to it; in the
//! daemon it is owned by the hub actor and only mutated from that task.

use std::collections::VecDeque;

use tracing::debug;

use crate::event::{EventKind, Frame};

/// Default number of console/reliable frames retained for replay.
pub const DEFAULT_REPLAY_CAPACITY: usize = 512;

/// Fixed-capacity history of recent frames.
///
/// # Invariants
///
/// - `frames.len() <= capacity` at all times; the oldest frame is evicted first
/// - at most one metrics frame is held, and it is always the most recent one
#[derive(Debug, Clone)]
pub struct ReplayStore {
    frames: VecDeque<Frame>,
    latest_metrics: Option<Frame>,
    capacity: usize,
}

impl ReplayStore {
    /// Creates an empty store. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            latest_metrics: None,
            capacity,
        }
    }

    /// Applies a frame to the history.
    ///
    /// - `Console`/`Reliable`: appended, evicting the oldest frame when full
    /// - `Metrics`: replaces the latest-metrics slot
    /// - `Clear`: empties the buffer and the metrics slot
    pub fn record(&mut self, frame: Frame) {
        match frame.kind() {
            EventKind::Console | EventKind::Reliable => {
                if self.frames.len() >= self.capacity {
                    self.frames.pop_front();
                }
                self.frames.push_back(frame);
            }
            EventKind::Metrics => {
                self.latest_metrics = Some(frame);
            }
            EventKind::Clear => {
                debug!(
                    dropped_frames = self.frames.len(),
                    had_metrics = self.latest_metrics.is_some(),
                    "Replay history cleared"
                );
                self.frames.clear();
                self.latest_metrics = None;
            }
        }
    }

    /// Returns the buffered frames in arrival order, followed by the latest
    /// metrics frame if one is held.
    pub fn snapshot(&self) -> Vec<Frame> {
        let mut out = Vec::with_capacity(self.frames.len() + 1);
        out.extend(self.frames.iter().cloned());
        if let Some(ref metrics) = self.latest_metrics {
            out.push(metrics.clone());
        }
        out
    }

    /// Number of buffered console/reliable frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no console/reliable frames are buffered.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Maximum number of buffered console/reliable frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The latest metrics frame, if any has arrived since the last clear.
    pub fn latest_metrics(&self) -> Option<&Frame> {
        self.latest_metrics.as_ref()
    }
}

impl Default for ReplayStore {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_CAPACITY)
    }
}
