//! Event fan-out for Inkling.
//!
//! The room engine publishes every [`RoomEvent`](inkling_protocol::RoomEvent)
//! through a [`Publisher`](inkling_protocol::Publisher). This crate provides
//! the one the server uses:
//!
//! - [`TopicHub`]: in-process fan-out, one broadcast channel per topic
//! - [`FanoutServer`]: lets WebSocket clients subscribe to `rooms/{code}`
//!   topics on a hub
//!
//! # Feature Flags
//!
//! - `websocket` (default): the WebSocket server via `tokio-tungstenite`

mod error;
mod hub;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use hub::{TopicHub, DEFAULT_TOPIC_CAPACITY};
#[cfg(feature = "websocket")]
pub use websocket::FanoutServer;

use std::fmt;

/// Opaque identifier for a subscriber connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
