//! Wire protocol for Inkling.
//!
//! This crate defines the "language" shared by the room engine and the
//! clients watching a room:
//!
//! - **Types** ([`PlayerId`], [`RoomCode`], [`RoomStatus`], ...): the
//!   identifiers and phase enums every other layer speaks in.
//! - **Views** ([`RoomSnapshot`], [`RoundResult`], ...): what actions
//!   return to the caller. Never carries a session token except in the
//!   [`JoinReceipt`] handed to the joining player.
//! - **Events** ([`RoomEvent`]): what gets broadcast on a room topic.
//! - **Publishing** ([`Publisher`]): the collaborator that delivers events.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//!
//! # Architecture
//!
//! ```text
//! Room actor → RoomEvent → Publisher(topic) → fan-out → clients
//! ```

mod codec;
mod error;
mod event;
mod frames;
mod publish;
mod types;
mod views;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{EndReason, RoomEvent};
pub use frames::{ClientFrame, ServerFrame};
pub use publish::{room_topic, Publisher};
pub use types::{
    GameId, GameStatus, PlayerId, RoomCode, RoomId, RoomStatus, Winner,
    CODE_ALPHABET, CODE_LENGTH,
};
pub use views::{
    DrawingView, JoinReceipt, PlayerView, PromptView, RoomSnapshot,
    RoomSummary, RoundResult, RoundStart, SubmissionStatus, Tally,
};
