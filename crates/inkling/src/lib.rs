//! # Inkling
//!
//! Room and round engine for imposter drawing party games.
//!
//! Players join a room by its six-character code, one of them is secretly
//! handed a different prompt, everyone draws, then everyone votes on who
//! the imposter was. This crate wires the layers together:
//!
//! - [`GameApi`]: every player and host action
//! - [`InklingServer`]: store, blobs, topic hub, sweeper and the WebSocket
//!   fan-out clients subscribe through
//! - [`ServerConfig`]: defaults plus `INKLING_*` environment overrides
//! - [`telemetry`]: `tracing` setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inkling::prelude::*;
//!
//! # async fn demo() -> Result<(), InklingError> {
//! let server = InklingServer::builder().bind("127.0.0.1:8080").build().await?;
//! let api = server.api();
//!
//! let room = api.create_room().await?;
//! let host = api.join_room(room.code.as_str(), Some("Ada".into())).await?;
//! assert!(host.is_admin);
//! # Ok(())
//! # }
//! ```

mod api;
mod config;
mod error;
mod server;
pub mod telemetry;

pub use api::GameApi;
pub use config::{
    ConfigError, ServerConfig, ENV_ASSET_PREFIX, ENV_BIND, ENV_MAX_GAME_AGE_SECS,
    ENV_SWEEP_PERIOD_SECS, ENV_UPLOADS_DIR,
};
pub use error::InklingError;
pub use server::{InklingServer, InklingServerBuilder};

/// Re-exports for the common case.
pub mod prelude {
    pub use crate::{GameApi, InklingError, InklingServer, ServerConfig};
    pub use inkling_protocol::{
        ClientFrame, EndReason, GameId, PlayerId, RoomCode, RoomEvent, RoomStatus, ServerFrame,
        Winner,
    };
    pub use inkling_room::ErrorKind;
}
