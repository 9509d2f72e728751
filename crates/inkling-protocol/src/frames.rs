//! Frames exchanged with a fan-out subscriber.
//!
//! A subscriber connection is read-mostly: the client names the topics it
//! wants and the server pushes [`RoomEvent`]s wrapped in
//! [`ServerFrame::Event`]. Nothing here mutates game state; actions go
//! through the room API.

use serde::{Deserialize, Serialize};

use crate::RoomEvent;

/// Sent by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Start receiving events for `topic` (e.g. `rooms/K7QXRM`).
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    /// Keep-alive. Answered with [`ServerFrame::Pong`].
    Ping { nonce: u64 },
}

/// Sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    Subscribed { topic: String },
    Unsubscribed { topic: String },
    /// One published event on a topic this connection subscribed to.
    Event { topic: String, event: RoomEvent },
    Pong { nonce: u64 },
    /// The previous frame was rejected. The connection stays open.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoomCode;

    #[test]
    fn test_server_frame_event_nests_room_event() {
        let frame = ServerFrame::Event {
            topic: "rooms/ABCDEF".into(),
            event: RoomEvent::RoomReset {
                room_code: RoomCode::parse("ABCDEF").unwrap(),
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "Event");
        assert_eq!(json["event"]["type"], "ROOM_RESET");
    }

    #[test]
    fn test_client_frame_ping_roundtrip() {
        let json = r#"{"type":"Ping","nonce":7}"#;
        let frame: ClientFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame, ClientFrame::Ping { nonce: 7 });
    }
}
