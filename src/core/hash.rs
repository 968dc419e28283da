//! Hashing Primitives
//!
//! SHA-256 helpers and hex codecs shared by the move commitment,
//! seed handling and the submission payload.

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type Hash32 = [u8; 32];

/// All-zero hash, the genesis value of every hash chain.
pub const ZERO_HASH: Hash32 = [0u8; 32];

/// Compute a simple hash of arbitrary data.
pub fn hash_bytes(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash two parts as one message, `SHA256(a ‖ b)`.
pub fn hash_concat(a: &[u8], b: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// Encode a hash as lowercase hex (no prefix).
pub fn to_hex(hash: &Hash32) -> String {
    hex::encode(hash)
}

/// Decode a 32-byte hash from hex, accepting an optional `0x` prefix.
pub fn from_hex(s: &str) -> Option<Hash32> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).ok()?.try_into().ok()
}

/// Serde adapter storing a `Hash32` as a hex string.
pub mod hex_hash {
    use super::{from_hex, to_hex, Hash32};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as lowercase hex.
    pub fn serialize<S: Serializer>(hash: &Hash32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(hash))
    }

    /// Deserialize from hex, with or without `0x`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash32, D::Error> {
        let s = String::deserialize(deserializer)?;
        from_hex(&s).ok_or_else(|| de::Error::custom(format!("invalid 32-byte hex: {}", s)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
