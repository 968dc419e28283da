//! Deterministic Random Number Generator
//!
//! Linear congruential generator seeded from a string.
//! Given the same seed string, produces the identical sequence of floats on every platform.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};
use thiserror::Error;

/// LCG multiplier.
pub const LCG_MULTIPLIER: i64 = 1_664_525;

/// LCG increment.
pub const LCG_INCREMENT: i64 = 1_013_904_223;

/// LCG modulus (2^32).
pub const LCG_MODULUS: i64 = 1 << 32;

/// Seeded PRNG producing floats in `[0, 1)`.
///
/// # Determinism Guarantee
///
/// The sequence depends only on the seed string and the number of prior
/// `next_f64` calls. The state is kept as a signed remainder: the modulus
/// step truncates toward zero, so a negative seed hash keeps producing
/// negative states, which `next_f64` folds back into `[0, 1)`.
///
/// # Example
///
/// ```
/// use tilechain::core::rng::DeterministicRandom;
///
/// let mut a = DeterministicRandom::new("abc");
/// let mut b = DeterministicRandom::new("abc");
/// assert_eq!(a.next_f64(), b.next_f64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRandom {
    state: i64,
    draws: u64,
}

impl DeterministicRandom {
    /// Create a new generator from a seed string.
    pub fn new(seed: &str) -> Self {
        Self {
            state: seed_hash(seed) as i64,
            draws: 0,
        }
    }

    /// Generate the next value in `[0, 1)`.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        // |state| < 2^32, so the product stays well inside i64.
        self.state = (LCG_MULTIPLIER * self.state + LCG_INCREMENT) % LCG_MODULUS;
        self.draws += 1;

        let value = self.state as f64 / LCG_MODULUS as f64;
        if value < 0.0 {
            value + 1.0
        } else {
            value
        }
    }

    /// Generate an index in `[0, len)`. Consumes exactly one draw.
    #[inline]
    pub fn next_index(&mut self, len: usize) -> usize {
        let idx = (self.next_f64() * len as f64).floor() as usize;
        // Guards float rounding at the top of the range.
        idx.min(len.saturating_sub(1))
    }

    /// Advance the generator by `count` draws, discarding the values.
    pub fn skip(&mut self, count: u64) {
        for _ in 0..count {
            self.next_f64();
        }
    }

    /// Number of draws consumed since construction.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Current raw state (for checkpointing/debugging).
    pub fn state(&self) -> i64 {
        self.state
    }
}

/// Fold a seed string into a signed 32-bit integer.
///
/// `hash = hash * 31 + code_unit`, wrapping at 32 bits, over the UTF-16
/// code units of the string.
pub fn seed_hash(seed: &str) -> i32 {
    seed.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

// =============================================================================
// SEED DERIVATION
// =============================================================================

/// Inputs supplied by the external seed source at session start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedInputs {
    /// 32 bytes of randomness, hex encoded (optional `0x` prefix).
    pub randomness: String,

    /// Player identifier (wallet address); `None` for anonymous play.
    pub identifier: Option<String>,

    /// Session start time, epoch milliseconds.
    pub start_time: i64,
}

impl SeedInputs {
    /// Create seed inputs.
    pub fn new(randomness: impl Into<String>, identifier: Option<String>, start_time: i64) -> Self {
        Self {
            randomness: randomness.into(),
            identifier,
            start_time,
        }
    }

    /// Validate the randomness and return it as raw bytes.
    pub fn randomness_bytes(&self) -> Result<[u8; 32], SeedError> {
        parse_randomness(&self.randomness)
    }

    /// Derive the session seed (hex encoded SHA-256).
    pub fn derive_seed(&self) -> Result<String, SeedError> {
        let randomness = self.randomness_bytes()?;
        Ok(derive_seed(&randomness, self.identifier.as_deref(), self.start_time))
    }
}

/// Errors in the seed source data. Fatal for a session start attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    /// No randomness was supplied.
    #[error("Randomness is empty")]
    EmptyRandomness,

    /// Randomness is not valid hex.
    #[error("Randomness is not valid hex: {0}")]
    InvalidRandomness(String),

    /// Randomness decoded to the wrong number of bytes.
    #[error("Randomness must be 32 bytes, got {0}")]
    WrongRandomnessLength(usize),
}

/// Parse `0x`-prefixed or bare hex randomness into 32 bytes.
pub fn parse_randomness(randomness: &str) -> Result<[u8; 32], SeedError> {
    let trimmed = randomness.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(SeedError::EmptyRandomness);
    }

    let bytes = hex::decode(digits).map_err(|e| SeedError::InvalidRandomness(e.to_string()))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| SeedError::WrongRandomnessLength(len))
}

/// Derive a session seed from verifiable parameters.
///
/// `seed = hex(SHA256(randomness ‖ identifier ‖ decimal(start_time)))`, where
/// randomness is rendered in canonical form (`0x` + 64 lowercase hex digits)
/// and the identifier is the empty string for anonymous play. All three
/// parts are hashed as UTF-8 text.
pub fn derive_seed(randomness: &[u8; 32], identifier: Option<&str>, start_time: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_randomness(randomness).as_bytes());
    hasher.update(identifier.unwrap_or("").as_bytes());
    hasher.update(start_time.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical text form of the randomness used in seed derivation.
pub fn canonical_randomness(randomness: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(randomness))
}

// =============================================================================
// TESTS
// =============================================================================
