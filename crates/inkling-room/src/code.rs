//! Room code generation.

use inkling_protocol::{RoomCode, CODE_ALPHABET, CODE_LENGTH};
use rand::Rng;

/// Draws a random code from [`CODE_ALPHABET`]. Uniqueness is the store's
/// job; callers retry on a room code conflict.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    let indices: [usize; CODE_LENGTH] =
        std::array::from_fn(|_| rng.random_range(0..CODE_ALPHABET.len()));
    RoomCode::from_indices(indices)
}
