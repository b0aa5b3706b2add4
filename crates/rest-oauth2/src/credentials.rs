//! Random credential generation and constant-time comparison.

use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Public client id length.
pub const CLIENT_ID_LENGTH: usize = 12;
/// Client secret length.
pub const CLIENT_SECRET_LENGTH: usize = 48;
/// Authorization code length.
pub const AUTH_CODE_LENGTH: usize = 12;
/// Access token key length (~190 bits).
pub const ACCESS_TOKEN_LENGTH: usize = 32;

/// Generate a random alphanumeric string.
#[must_use]
pub fn generate(length: usize) -> String {
    thread_rng().sample_iter(&Alphanumeric).take(length).map(char::from).collect()
}

/// Compare two secrets without leaking where they differ.
///
/// Both values are hashed first so the comparison length is fixed.
#[must_use]
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.as_slice().ct_eq(expected.as_slice()).into()
}
