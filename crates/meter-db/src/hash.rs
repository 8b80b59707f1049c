//! API key digests

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a raw API key.
///
/// Keys are stored and looked up by digest only.
pub fn hash_api_key(raw_key: &str) -> String {
    hex::encode(Sha256::digest(raw_key.as_bytes()))
}
