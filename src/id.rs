//! Note identifier generation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Generate a random URL-safe note identifier of exactly `length` characters.
///
/// Samples `length` bytes from the thread-local CSPRNG and base64-url encodes
/// them, then trims to `length` characters (~6 bits of entropy per character).
/// Uniqueness is probabilistic; collisions are not checked on insert.
pub fn generate_note_id(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut id = URL_SAFE_NO_PAD.encode(&bytes);
    id.truncate(length);
    id
}
