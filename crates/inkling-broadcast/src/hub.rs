//! In-process topic fan-out.

use std::collections::HashMap;

use inkling_protocol::{Publisher, RoomEvent};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Events buffered per topic before a slow subscriber starts lagging.
pub const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// A [`Publisher`] that fans each event out to every receiver subscribed
/// to its topic.
///
/// One `tokio::sync::broadcast` channel per topic, created on first
/// subscribe and dropped once a publish finds no receivers left. Events on
/// a topic nobody listens to are discarded.
pub struct TopicHub {
    topics: Mutex<HashMap<String, broadcast::Sender<RoomEvent>>>,
    capacity: usize,
}

impl TopicHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Receives every event published on `topic` from now on.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<RoomEvent> {
        let mut topics = self.topics.lock();
        if let Some(tx) = topics.get(topic) {
            return tx.subscribe();
        }
        let (tx, rx) = broadcast::channel(self.capacity);
        topics.insert(topic.to_string(), tx);
        tracing::debug!(topic, "topic opened");
        rx
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Topics with a live channel.
    pub fn topic_count(&self) -> usize {
        self.topics.lock().len()
    }
}

impl Default for TopicHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for TopicHub {
    fn publish(&self, topic: &str, event: RoomEvent) {
        let mut topics = self.topics.lock();
        let Some(tx) = topics.get(topic) else {
            tracing::trace!(topic, event = event.kind(), "no subscribers");
            return;
        };
        if tx.send(event).is_err() {
            topics.remove(topic);
            tracing::debug!(topic, "topic closed, last subscriber gone");
        }
    }
}
