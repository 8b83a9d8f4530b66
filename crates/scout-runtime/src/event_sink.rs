//! Observability hooks for decision events.
//!
//! The decision engine returns [`DecisionEvent`]s instead of logging; the
//! control loop wraps each one in a [`MissionEvent`] envelope and hands it to
//! every registered [`EventSink`].
//!
//! | Sink | Behaviour |
//! |---|---|
//! | [`TracingSink`] | Structured `tracing` events, level chosen per event kind. |
//! | [`BroadcastSink`] | Fan-out over a [`tokio::sync::broadcast`] channel; any number of subscribers. |
//! | [`NullSink`] | Drops everything. |

use scout_types::{DecisionEvent, MissionEvent};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Default broadcast capacity (events buffered before slow subscribers lag).
const DEFAULT_CAPACITY: usize = 256;

/// Receives every event the control loop emits.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &MissionEvent);
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &MissionEvent) {
        let tick = event.tick;
        match &event.payload {
            DecisionEvent::ModeChanged { from, to } => {
                info!(tick, %from, %to, "drive mode changed")
            }
            DecisionEvent::StuckDetected { steer } => {
                warn!(tick, steer, "rover stuck; braking for recovery turn")
            }
            DecisionEvent::TargetAcquired { range } => {
                info!(tick, range, "rock sample acquired")
            }
            DecisionEvent::TargetLost => info!(tick, "rock sample lost"),
            DecisionEvent::ObservationMissing => {
                debug!(tick, "no observation; safe default applied")
            }
            DecisionEvent::PickupRequested => info!(tick, "pickup requested"),
        }
    }
}

/// Publishes events on a broadcast channel.  Clone it cheaply – all clones
/// share the same channel.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<MissionEvent>,
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MissionEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: &MissionEvent) {
        // No subscribers is a normal condition.
        let _ = self.sender.send(event.clone());
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _: &MissionEvent) {}
}
