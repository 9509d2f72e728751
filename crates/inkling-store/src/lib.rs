//! Storage collaborators for Inkling.
//!
//! Two traits sit at the seams between the room engine and the outside
//! world:
//!
//! - [`EntityStore`]: durable rows for rooms, players, rounds,
//!   participants, drawings and votes. Every mutation goes through
//!   [`EntityStore::commit`] as one all-or-nothing [`Changeset`], and
//!   unique constraints are checked inside the commit, not by callers.
//! - [`BlobStore`]: where drawing images land. A put is atomic from a
//!   reader's point of view.
//!
//! [`MemoryStore`], [`FsBlobStore`] and [`MemoryBlobStore`] are the
//! implementations the server ships with.

mod blob;
mod changeset;
mod error;
mod memory;
mod prompts;
mod records;
mod store;

pub use blob::{BlobKey, BlobStore, FsBlobStore, MemoryBlobStore, DEFAULT_FILE_NAME};
pub use changeset::{Changeset, Write};
pub use error::{BlobError, Constraint, StoreError};
pub use memory::MemoryStore;
pub use prompts::default_prompts;
pub use records::{
    DrawingRecord, GameRecord, ParticipantRecord, PlayerRecord, PromptPair,
    RoomRecord, VoteRecord,
};
pub use store::EntityStore;
