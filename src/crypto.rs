//! Hashing for bundle integrity checks.
//!
//! Anchors and signatures are only detected, never validated, so the only
//! primitive needed is SHA-256 over the raw archive bytes.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of data and returns lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compares a declared digest against the computed lowercase hex digest.
///
/// The comparison is exact: uppercase hex or padding is a mismatch.
pub fn digest_matches(declared: &str, actual: &str) -> bool {
    declared == actual
}
