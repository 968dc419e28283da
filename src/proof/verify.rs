//! Verification API
//!
//! Verify games by deterministic replay from `(seed, move log)` alone.
//! Claimed values are compared, never trusted or corrected.

use tracing::{debug, warn};

use crate::core::hash::{to_hex, Hash32};
use crate::core::rng::derive_seed;
use crate::game::session::GameSession;
use crate::game::tile::{Board, Direction, Tile};
use crate::proof::codec::{pack_board, CodecError};
use crate::proof::submission::SubmissionPayload;

/// Trajectory recomputed from a seed and a move log.
#[derive(Debug, Clone)]
pub struct Replay {
    /// Final tiles.
    pub tiles: Vec<Tile>,
    /// Final score.
    pub score: u64,
    /// Final commitment over the accepted moves.
    pub commitment: Hash32,
    /// Moves that changed the grid.
    pub accepted_moves: usize,
    /// Index of the first move that was a no-op (unmoved grid or game over).
    pub first_rejected: Option<usize>,
    /// Whether the replayed game ended.
    pub is_over: bool,
    /// Generator draws consumed.
    pub draws: u64,
}

impl Replay {
    /// Final board view.
    pub fn board(&self) -> Board {
        Board::from_tiles(&self.tiles)
    }
}

/// Verification result.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    /// Did verification pass?
    pub ok: bool,

    /// Score from replay.
    pub recomputed_score: u64,

    /// Score claimed by the submitter.
    pub claimed_score: u64,

    /// Commitment from replay.
    pub recomputed_commitment: Hash32,

    /// Commitment claimed by the submitter.
    pub claimed_commitment: Hash32,

    /// First mismatch found, if any.
    pub error: Option<VerificationError>,
}

/// Reasons a claim fails verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// A logged move could not have been accepted during live play.
    #[error("Move {index} does not change the grid")]
    InvalidMove {
        /// Position in the log.
        index: usize,
    },

    /// Commitment mismatch.
    #[error("Commitment mismatch: claimed {}, recomputed {}", to_hex(.claimed), to_hex(.recomputed))]
    CommitmentMismatch {
        /// Claimed value.
        claimed: Hash32,
        /// Replayed value.
        recomputed: Hash32,
    },

    /// Score mismatch.
    #[error("Score mismatch: claimed {claimed}, recomputed {recomputed}")]
    ScoreMismatch {
        /// Claimed value.
        claimed: u64,
        /// Replayed value.
        recomputed: u64,
    },

    /// Seed does not derive from the stated seed source.
    #[error("Seed mismatch: payload {}, derived {}", to_hex(.claimed), to_hex(.derived))]
    SeedMismatch {
        /// Seed in the payload.
        claimed: Hash32,
        /// Seed derived from randomness, identifier and start time.
        derived: Hash32,
    },

    /// Packed board mismatch.
    #[error("Board mismatch: claimed {claimed:#018x}, recomputed {recomputed:#018x}")]
    BoardMismatch {
        /// Claimed packed board.
        claimed: u64,
        /// Replayed packed board.
        recomputed: u64,
    },

    /// Replayed board holds a tile too large to pack.
    #[error("Replayed board cannot be packed: {0}")]
    Unpackable(CodecError),

    /// End time precedes start time.
    #[error("End time {end_time} precedes start time {start_time}")]
    InvalidTimes {
        /// Start time.
        start_time: i64,
        /// End time.
        end_time: i64,
    },
}

/// Replay a move log from a seed.
///
/// Runs the live spawn/move rules. Moves that would have been ignored live
/// are skipped here too and reported through `first_rejected`.
pub fn replay(seed: &str, moves: &[Direction]) -> Replay {
    let mut session = GameSession::from_seed(seed);
    let mut first_rejected = None;

    for (index, dir) in moves.iter().enumerate() {
        // A fresh session never has a pending spawn, so this cannot fail.
        let moved = session
            .apply_player_move(*dir)
            .map(|outcome| outcome.moved)
            .unwrap_or(false);
        if !moved && first_rejected.is_none() {
            first_rejected = Some(index);
        }
    }

    Replay {
        tiles: session.tiles().to_vec(),
        score: session.score(),
        commitment: session.commitment(),
        accepted_moves: session.move_log().len(),
        first_rejected,
        is_over: session.is_over(),
        draws: session.draws_consumed(),
    }
}

/// Verify a claimed score and commitment against a replay.
pub fn verify(
    seed: &str,
    moves: &[Direction],
    claimed_score: u64,
    claimed_commitment: Hash32,
) -> VerificationResult {
    let replayed = replay(seed, moves);
    let error = check_claims(&replayed, claimed_score, claimed_commitment);
    finish(replayed, claimed_score, claimed_commitment, error)
}

/// Verify a full submission payload against its move log.
///
/// On top of `verify`, the seed must derive from the payload's randomness,
/// the identifier and the start time, the times must be ordered, and the
/// packed board must equal the replayed final board.
pub fn verify_submission(
    payload: &SubmissionPayload,
    moves: &[Direction],
    identifier: Option<&str>,
) -> VerificationResult {
    let claimed_score = payload.score;
    let claimed_commitment = payload.moves_commitment;
    let replayed = replay(&payload.seed_string(), moves);

    let error = check_submission(payload, identifier, &replayed)
        .or_else(|| check_claims(&replayed, claimed_score, claimed_commitment));
    finish(replayed, claimed_score, claimed_commitment, error)
}

fn check_submission(
    payload: &SubmissionPayload,
    identifier: Option<&str>,
    replayed: &Replay,
) -> Option<VerificationError> {
    if payload.end_time < payload.start_time {
        return Some(VerificationError::InvalidTimes {
            start_time: payload.start_time,
            end_time: payload.end_time,
        });
    }

    let derived = derive_seed(&payload.randomness, identifier, payload.start_time);
    // derive_seed always yields 64 hex digits.
    let derived_bytes: Hash32 = hex::decode(&derived)
        .ok()
        .and_then(|b| b.try_into().ok())
        .unwrap_or_default();
    if derived_bytes != payload.seed {
        return Some(VerificationError::SeedMismatch {
            claimed: payload.seed,
            derived: derived_bytes,
        });
    }

    match pack_board(&replayed.tiles) {
        Ok(packed) if packed != payload.packed_board => Some(VerificationError::BoardMismatch {
            claimed: payload.packed_board,
            recomputed: packed,
        }),
        Ok(_) => None,
        Err(e) => Some(VerificationError::Unpackable(e)),
    }
}

fn check_claims(replayed: &Replay, claimed_score: u64, claimed_commitment: Hash32) -> Option<VerificationError> {
    if let Some(index) = replayed.first_rejected {
        return Some(VerificationError::InvalidMove { index });
    }
    if replayed.commitment != claimed_commitment {
        return Some(VerificationError::CommitmentMismatch {
            claimed: claimed_commitment,
            recomputed: replayed.commitment,
        });
    }
    if replayed.score != claimed_score {
        return Some(VerificationError::ScoreMismatch {
            claimed: claimed_score,
            recomputed: replayed.score,
        });
    }
    None
}

fn finish(
    replayed: Replay,
    claimed_score: u64,
    claimed_commitment: Hash32,
    error: Option<VerificationError>,
) -> VerificationResult {
    match &error {
        Some(e) => warn!("Verification failed: {}", e),
        None => debug!(
            "Verified {} moves, score {}, commitment {}",
            replayed.accepted_moves,
            replayed.score,
            to_hex(&replayed.commitment)
        ),
    }

    VerificationResult {
        ok: error.is_none(),
        recomputed_score: replayed.score,
        claimed_score,
        recomputed_commitment: replayed.commitment,
        claimed_commitment,
        error,
    }
}
