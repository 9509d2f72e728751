//! The publish collaborator.
//!
//! The room engine hands every event to a [`Publisher`] after the state
//! change it describes has been committed. Delivery is at-least-once per
//! subscriber with no ordering guarantee across topics.

use std::sync::Arc;

use crate::{RoomCode, RoomEvent};

/// Delivers events to whoever listens on a topic.
///
/// Publishing is synchronous and must not block: implementations queue or
/// drop, they never wait on a slow subscriber.
pub trait Publisher: Send + Sync + 'static {
    fn publish(&self, topic: &str, event: RoomEvent);
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, topic: &str, event: RoomEvent) {
        (**self).publish(topic, event);
    }
}

/// The topic every event for `code` is published on.
pub fn room_topic(code: &RoomCode) -> String {
    format!("rooms/{code}")
}
