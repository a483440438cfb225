//! Coupon code issuance.
//!
//! Codes are derived from 16 cryptographically random bytes, hashed and
//! truncated to 8 uppercase hex characters. The caller is responsible for
//! retrying against the unique constraint on insert; a collision must never
//! overwrite an existing code.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

pub const COUPON_CODE_LEN: usize = 8;

/// How many fresh codes an insert will try before giving up. Collisions at
/// 8 hex chars are vanishingly rare, so exhausting this points at a bug.
pub const COUPON_INSERT_ATTEMPTS: usize = 5;

pub fn generate_coupon_code() -> String {
    let mut raw = [0u8; 16];
    OsRng.fill_bytes(&mut raw);
    let digest = Sha256::digest(raw);
    hex::encode(digest)[..COUPON_CODE_LEN].to_uppercase()
}
