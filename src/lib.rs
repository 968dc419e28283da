//! # Tilechain Engine
//!
//! Deterministic 4x4 sliding-merge engine whose results a third party can
//! check by replay.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TILECHAIN ENGINE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - String-seeded LCG, seed derivation        │
//! │  └── hash.rs     - SHA-256 helpers, hex codecs               │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── tile.rs     - Tiles, directions, board view             │
//! │  ├── grid.rs     - Slide/merge transition                    │
//! │  ├── session.rs  - One game, spawns and move log             │
//! │  └── snapshot.rs - Persisted session and restore             │
//! │                                                              │
//! │  proof/          - Verification                              │
//! │  ├── commitment.rs - Move hash chain                         │
//! │  ├── codec.rs    - Board and move packing                    │
//! │  ├── submission.rs - Settlement payload                      │
//! │  └── verify.rs   - Replay verifier                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! Replaying a move log against its seed, from scratch, reproduces the exact
//! tiles, score and commitment recorded during live play:
//! - One generator per session, seeded only from the session seed
//! - Exactly two draws per spawn
//! - No system time or global state inside the engine

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod proof;

// Re-export commonly used types
pub use crate::core::rng::{DeterministicRandom, SeedInputs, SeedError};
pub use crate::core::hash::Hash32;
pub use game::{Direction, Tile, Board, GameSession, MoveOutcome, SessionSnapshot};
pub use proof::{SubmissionPayload, VerificationResult, verify, verify_submission};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Grid side length.
pub const GRID_SIZE: usize = 4;

/// Number of cells on the grid.
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// Tiles spawned when a session starts.
pub const INITIAL_TILES: usize = 2;

/// Generator draws per spawn: one for the cell, one for the value.
pub const DRAWS_PER_SPAWN: usize = 2;

/// Probability that a spawned tile is a 2 (otherwise 4).
pub const TWO_PROBABILITY: f64 = 0.9;

/// Largest tile exponent a board nibble can hold (2^15 = 32768).
pub const MAX_PACKABLE_EXPONENT: u32 = 15;
