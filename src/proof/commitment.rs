//! Move Commitment
//!
//! Hash chain over the move log: `h(n+1) = SHA256(h(n) ‖ code(move))`,
//! starting from 32 zero bytes. The final value binds the whole ordered
//! move history.

use crate::core::hash::{hash_concat, Hash32, ZERO_HASH};
use crate::game::tile::Direction;

/// Genesis value of the chain.
pub const GENESIS: Hash32 = ZERO_HASH;

/// Fold one move into the chain.
#[inline]
pub fn update(prev: &Hash32, direction: Direction) -> Hash32 {
    hash_concat(prev, &[direction.code()])
}

/// Commitment over a full move log, from genesis.
pub fn commit_moves(moves: &[Direction]) -> Hash32 {
    moves.iter().fold(GENESIS, |hash, dir| update(&hash, *dir))
}

/// Running commitment accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveCommitment {
    hash: Hash32,
    moves: u64,
}

impl Default for MoveCommitment {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveCommitment {
    /// Start at genesis.
    pub fn new() -> Self {
        Self {
            hash: GENESIS,
            moves: 0,
        }
    }

    /// Fold in the next move.
    pub fn push(&mut self, direction: Direction) {
        self.hash = update(&self.hash, direction);
        self.moves += 1;
    }

    /// Current chain value.
    pub fn hash(&self) -> Hash32 {
        self.hash
    }

    /// Number of moves folded in.
    pub fn len(&self) -> u64 {
        self.moves
    }

    /// True at genesis.
    pub fn is_empty(&self) -> bool {
        self.moves == 0
    }
}
