//! Code generation and digests.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

/// Uniformly random six-digit code.
pub(super) fn generate_code() -> String {
    rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Lowercase hex SHA-256 of the code's UTF-8 bytes. Only this digest is ever stored.
#[must_use]
pub fn sha256_hex(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Compare a supplied code against a stored digest without leaking timing.
pub(super) fn digest_matches(code: &str, stored_hash: &str) -> bool {
    let computed = sha256_hex(code);
    computed
        .as_bytes()
        .ct_eq(stored_hash.to_ascii_lowercase().as_bytes())
        .into()
}
