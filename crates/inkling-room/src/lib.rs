//! Rooms and rounds for Inkling.
//!
//! Each room runs as an isolated Tokio task (actor model). Every action on
//! a room, from a player joining to the sweeper ending a stale round, is a
//! command processed in arrival order by that room's actor, so phase
//! transitions happen exactly once no matter how many requests race.
//!
//! # Key types
//!
//! - [`RoomManager`]: creates rooms and hands out handles by code
//! - [`RoomHandle`]: async methods for every room and round action
//! - [`RoomDeps`]: the store, blob store, publisher, clock and
//!   authenticator a room works against
//! - [`Sweeper`]: periodically ends rounds that ran too long
//! - [`round`]: the pure selection and scoring rules

mod broadcast;
mod code;
mod config;
mod deps;
mod error;
mod manager;
mod room;
pub mod round;
mod sweeper;

pub use broadcast::{EventBroadcaster, RecordingPublisher};
pub use code::generate_code;
pub use config::{RoomConfig, SweeperConfig};
pub use deps::RoomDeps;
pub use error::{session_kind, ErrorKind, RoomError};
pub use manager::RoomManager;
pub use room::RoomHandle;
pub use sweeper::{SweepReport, Sweeper};
