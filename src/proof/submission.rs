//! Submission Payload
//!
//! The tuple handed to the external settlement layer when a game ends.
//! Integer widths are part of the contract.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::{from_hex, hex_hash, Hash32};
use crate::game::session::GameSession;
use crate::proof::codec::{pack_board, CodecError};

/// Finished game, ready for settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    /// Packed final board.
    pub packed_board: u64,
    /// Final score.
    pub score: u64,
    /// Start time, epoch milliseconds.
    pub start_time: i64,
    /// End time, epoch milliseconds.
    pub end_time: i64,
    /// Session seed.
    #[serde(with = "hex_hash")]
    pub seed: Hash32,
    /// Seed source randomness.
    #[serde(with = "hex_hash")]
    pub randomness: Hash32,
    /// Commitment over the move log.
    #[serde(with = "hex_hash")]
    pub moves_commitment: Hash32,
}

/// Errors building a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The game is still running.
    #[error("Game is not over")]
    GameNotOver,

    /// A spawn is still owed.
    #[error("Spawn pending")]
    SpawnPending,

    /// Session seed was not derived from a seed source.
    #[error("Session has no seed source data")]
    MissingOrigin,

    /// Seed is not a 32-byte hex value.
    #[error("Seed is not a 32-byte hex value")]
    InvalidSeed,

    /// End time precedes start time.
    #[error("End time {end_time} precedes start time {start_time}")]
    InvalidTimes {
        /// Start time.
        start_time: i64,
        /// End time.
        end_time: i64,
    },

    /// Board cannot be packed.
    #[error("Board packing failed: {0}")]
    Codec(#[from] CodecError),

    /// Binary decoding failed.
    #[error("Payload decoding failed: {0}")]
    Decode(String),
}

impl SubmissionPayload {
    /// Build the payload for a finished session.
    pub fn from_session(session: &GameSession, end_time: i64) -> Result<Self, SubmissionError> {
        if session.has_pending_spawn() {
            return Err(SubmissionError::SpawnPending);
        }
        if !session.is_over() {
            return Err(SubmissionError::GameNotOver);
        }

        let origin = session.origin().ok_or(SubmissionError::MissingOrigin)?;
        if end_time < origin.start_time {
            return Err(SubmissionError::InvalidTimes {
                start_time: origin.start_time,
                end_time,
            });
        }
        let seed = from_hex(session.seed()).ok_or(SubmissionError::InvalidSeed)?;

        Ok(Self {
            packed_board: pack_board(session.tiles())?,
            score: session.score(),
            start_time: origin.start_time,
            end_time,
            seed,
            randomness: origin.randomness,
            moves_commitment: session.commitment(),
        })
    }

    /// Seed as the hex string the generator is keyed with.
    pub fn seed_string(&self) -> String {
        hex::encode(self.seed)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SubmissionError> {
        bincode::deserialize(data).map_err(|e| SubmissionError::Decode(e.to_string()))
    }
}
