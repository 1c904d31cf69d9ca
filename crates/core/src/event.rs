//! Domain events: decoupled notifications between the controller, the
//! behavior machine and anything observing the pet (CLI, tests, a UI).
//!
//! Publishing never blocks and never fails; with no subscribers events are
//! simply dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The behavior machine committed a transition.
    StateChanged {
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
    },

    /// The degradation ladder moved.
    LevelChanged {
        from: u8,
        to: u8,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A reply was handed to the presentation sink.
    ReplyProduced {
        event_type: String,
        source: String,
        level: u8,
        timestamp: DateTime<Utc>,
    },

    /// The pet fell asleep.
    SleepStarted {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The pet woke up.
    WokeUp {
        reason: String,
        slept_minutes: i64,
        mood_recovered: u32,
        timestamp: DateTime<Utc>,
    },

    /// A new dream is showing while the pet sleeps.
    Dreamed {
        emoji: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// The deep-sleep consolidation job finished.
    ConsolidationRan {
        summary_written: bool,
        triples_removed: usize,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// When the event happened, as read from the publisher's clock.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::StateChanged { timestamp, .. }
            | Self::LevelChanged { timestamp, .. }
            | Self::ReplyProduced { timestamp, .. }
            | Self::SleepStarted { timestamp, .. }
            | Self::WokeUp { timestamp, .. }
            | Self::Dreamed { timestamp, .. }
            | Self::ConsolidationRan { timestamp, .. } => *timestamp,
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_year() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap()
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::LevelChanged {
            from: 0,
            to: 2,
            reason: "network".into(),
            timestamp: new_year(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::LevelChanged { from, to, .. } => {
                assert_eq!(*from, 0);
                assert_eq!(*to, 2);
            }
            other => panic!("Expected LevelChanged, got {other:?}"),
        }
    }

    #[test]
    fn timestamp_reads_any_variant() {
        let at = new_year();
        let event = DomainEvent::Dreamed {
            emoji: "🌙".into(),
            content: "梦见小鱼干".into(),
            timestamp: at,
        };
        assert_eq!(event.timestamp(), at);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(DomainEvent::SleepStarted {
            reason: "idle".into(),
            timestamp: new_year(),
        });
    }
}
