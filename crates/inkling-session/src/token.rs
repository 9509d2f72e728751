//! Session token issuance.

use rand::Rng;

/// Random bytes per token. 16 bytes is 128 bits of entropy.
pub const TOKEN_BYTES: usize = 16;

/// Generates a fresh 32-character lowercase hex token from the
/// thread-local CSPRNG.
///
/// Tokens are never rotated and never reused; uniqueness is also enforced
/// by the store's session token constraint.
pub fn issue_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
