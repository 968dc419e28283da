//! Core deterministic primitives.
//!
//! Everything a replay depends on bit-for-bit: the seeded generator,
//! seed derivation and the hashing helpers.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::{DeterministicRandom, SeedInputs, SeedError, derive_seed};
pub use hash::{Hash32, ZERO_HASH};
