//! Persisted Session Snapshot
//!
//! The shape a session takes in external storage, and the rules for
//! resuming from it. On restore the generator is rebuilt from the seed and
//! advanced past every draw the stored game has already consumed.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{CELL_COUNT, GRID_SIZE, INITIAL_TILES};
use crate::core::hash::{from_hex, to_hex};
use crate::core::rng::{canonical_randomness, derive_seed, parse_randomness, SeedError, SeedInputs};
use crate::game::session::{GameSession, SeedOrigin, SessionError};
use crate::game::tile::{Direction, Tile, TileId};
use crate::proof::commitment::{commit_moves, MoveCommitment};

/// Session state as stored by the surrounding application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Tiles on the grid
    pub tiles: Vec<Tile>,
    /// Accumulated score
    pub score: u64,
    /// Game over flag
    pub is_over: bool,
    /// Seed string
    #[serde(default)]
    pub seed: Option<String>,
    /// Start time, epoch milliseconds
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Move codes (0-3), in order
    pub move_log: Vec<u8>,
    /// Seed source randomness, `0x` hex
    #[serde(default)]
    pub randomness: Option<String>,
    /// Player identifier
    #[serde(default)]
    pub identifier: Option<String>,
    /// Commitment over the move log, hex
    #[serde(default)]
    pub moves_commitment: Option<String>,
}

/// Reasons a snapshot cannot be resumed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// No seed stored.
    #[error("Snapshot has no seed")]
    MissingSeed,

    /// No commitment stored.
    #[error("Snapshot has no moves commitment")]
    MissingCommitment,

    /// Stored commitment is not 32-byte hex.
    #[error("Snapshot commitment is not a 32-byte hex value")]
    InvalidHash,

    /// Stored commitment does not match the stored move log.
    #[error("Snapshot commitment does not match its move log")]
    CommitmentMismatch,

    /// Move log holds a code outside 0-3.
    #[error("Invalid move code {0}")]
    InvalidMoveCode(u8),

    /// Tile set is not a valid grid.
    #[error("Invalid tile set: {0}")]
    InvalidTiles(String),

    /// Seed source data is malformed.
    #[error("Invalid seed source: {0}")]
    Seed(#[from] SeedError),

    /// Stored seed does not derive from the stored seed source.
    #[error("Snapshot seed does not derive from its seed source")]
    SeedMismatch,

    /// Not parseable as a snapshot.
    #[error("Malformed snapshot: {0}")]
    Malformed(String),
}

impl SessionSnapshot {
    /// Parse from JSON.
    pub fn from_json(s: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(s).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl GameSession {
    /// Capture the session for storage.
    ///
    /// Refused while a spawn is pending: the stored draw count would be one
    /// spawn short of the move log.
    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        if let Some(ticket) = self.pending {
            return Err(SessionError::SpawnPending { move_index: ticket.move_index });
        }

        let origin = self.origin.as_ref();
        Ok(SessionSnapshot {
            tiles: self.tiles.clone(),
            score: self.score,
            is_over: self.is_over,
            seed: Some(self.seed.clone()),
            start_time: origin.map(|o| o.start_time),
            move_log: self.move_log.iter().map(|d| d.code()).collect(),
            randomness: origin.map(|o| canonical_randomness(&o.randomness)),
            identifier: origin.and_then(|o| o.identifier.clone()),
            moves_commitment: Some(to_hex(&self.commitment.hash())),
        })
    }

    /// Resume a stored session.
    pub fn restore(snapshot: &SessionSnapshot) -> Result<Self, SnapshotError> {
        let seed = snapshot
            .seed
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(SnapshotError::MissingSeed)?;
        let stored_commitment = snapshot
            .moves_commitment
            .as_deref()
            .ok_or(SnapshotError::MissingCommitment)?;
        let stored_commitment = from_hex(stored_commitment).ok_or(SnapshotError::InvalidHash)?;

        let moves = snapshot
            .move_log
            .iter()
            .map(|code| Direction::from_code(*code).ok_or(SnapshotError::InvalidMoveCode(*code)))
            .collect::<Result<Vec<_>, _>>()?;

        if commit_moves(&moves) != stored_commitment {
            return Err(SnapshotError::CommitmentMismatch);
        }
        // Only spawns mint ids: two at start, one per accepted move.
        let next_tile_id = (INITIAL_TILES + moves.len() + 1) as TileId;
        validate_tiles(&snapshot.tiles, next_tile_id)?;

        let origin = match (&snapshot.randomness, snapshot.start_time) {
            (Some(randomness), Some(start_time)) => {
                let origin = SeedOrigin {
                    randomness: parse_randomness(randomness)?,
                    identifier: snapshot.identifier.clone(),
                    start_time,
                };
                let derived = derive_seed(&origin.randomness, origin.identifier.as_deref(), start_time);
                if !derived.eq_ignore_ascii_case(seed) {
                    return Err(SnapshotError::SeedMismatch);
                }
                Some(origin)
            }
            _ => None,
        };

        let mut session = GameSession::blank(seed.to_string(), origin);
        session.rng.skip(GameSession::expected_draws(moves.len()));

        let mut commitment = MoveCommitment::new();
        for m in &moves {
            commitment.push(*m);
        }

        session.tiles = snapshot.tiles.clone();
        session.score = snapshot.score;
        session.is_over = snapshot.is_over;
        session.move_log = moves;
        session.commitment = commitment;
        session.next_tile_id = next_tile_id;

        info!(
            "Session {} restored at move {}, score {}",
            session.id,
            session.move_log.len(),
            session.score
        );
        Ok(session)
    }
}

/// Resume from a snapshot when it is usable, otherwise start a fresh game.
pub fn resume_or_start(
    snapshot: Option<&SessionSnapshot>,
    inputs: &SeedInputs,
) -> Result<GameSession, SeedError> {
    if let Some(snapshot) = snapshot {
        match GameSession::restore(snapshot) {
            Ok(session) => return Ok(session),
            Err(e) => warn!("Discarding unusable snapshot: {}", e),
        }
    }
    GameSession::start(inputs)
}

fn validate_tiles(tiles: &[Tile], next_tile_id: TileId) -> Result<(), SnapshotError> {
    if tiles.len() > CELL_COUNT {
        return Err(SnapshotError::InvalidTiles(format!("{} tiles", tiles.len())));
    }

    let mut occupied = [false; CELL_COUNT];
    let mut ids = Vec::with_capacity(tiles.len());
    for tile in tiles {
        if tile.id == 0 || tile.id >= next_tile_id {
            return Err(SnapshotError::InvalidTiles(format!("tile id {} out of range", tile.id)));
        }
        if ids.contains(&tile.id) {
            return Err(SnapshotError::InvalidTiles(format!("tile id {} repeated", tile.id)));
        }
        ids.push(tile.id);
        if tile.row as usize >= GRID_SIZE || tile.col as usize >= GRID_SIZE {
            return Err(SnapshotError::InvalidTiles(format!(
                "tile {} at ({}, {})",
                tile.id, tile.row, tile.col
            )));
        }
        if tile.value < 2 || !tile.value.is_power_of_two() {
            return Err(SnapshotError::InvalidTiles(format!("tile {} value {}", tile.id, tile.value)));
        }
        if std::mem::replace(&mut occupied[tile.cell()], true) {
            return Err(SnapshotError::InvalidTiles(format!(
                "two tiles at ({}, {})",
                tile.row, tile.col
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANDOMNESS: &str = "0x0101010101010101010101010101010101010101010101010101010101010101";

    fn played_session(moves: usize) -> GameSession {
        let inputs = SeedInputs::new(RANDOMNESS, Some("0xfeed".to_string()), 1_700_000_000_000);
        let mut session = GameSession::start(&inputs).unwrap();
        while session.move_log().len() < moves && !session.is_over() {
            for dir in Direction::ALL {
                if session.apply_player_move(dir).unwrap().moved {
                    break;
                }
            }
        }
        session
    }

    #[test]
    fn test_snapshot_round_trip_json() {
        let session = played_session(12);
        let snapshot = session.snapshot().unwrap();
        let json = snapshot.to_json().unwrap();

        assert!(json.contains("\"movesCommitment\""));
        assert!(json.contains("\"justSpawned\""));
        assert_eq!(SessionSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_restore_advances_generator() {
        let mut live = played_session(15);
        let snapshot = live.snapshot().unwrap();
        let mut restored = GameSession::restore(&snapshot).unwrap();

        assert_eq!(restored.draws_consumed(), live.draws_consumed());
        assert_eq!(restored.commitment(), live.commitment());
        assert_eq!(restored.origin(), live.origin());

        // Both continue identically.
        for dir in Direction::ALL.iter().cycle().take(40) {
            let a = live.apply_player_move(*dir).unwrap();
            let b = restored.apply_player_move(*dir).unwrap();
            assert_eq!(a.moved, b.moved);
            assert_eq!(a.spawned.map(|t| (t.value, t.cell(), t.id)), b.spawned.map(|t| (t.value, t.cell(), t.id)));
        }
        assert_eq!(live.tiles(), restored.tiles());
        assert_eq!(live.score(), restored.score());
        assert_eq!(live.commitment(), restored.commitment());
    }

    #[test]
    fn test_restore_requires_seed_and_commitment() {
        let snapshot = played_session(3).snapshot().unwrap();

        let mut no_seed = snapshot.clone();
        no_seed.seed = None;
        assert_eq!(GameSession::restore(&no_seed).unwrap_err(), SnapshotError::MissingSeed);

        let mut empty_seed = snapshot.clone();
        empty_seed.seed = Some(String::new());
        assert_eq!(GameSession::restore(&empty_seed).unwrap_err(), SnapshotError::MissingSeed);

        let mut no_commitment = snapshot.clone();
        no_commitment.moves_commitment = None;
        assert_eq!(GameSession::restore(&no_commitment).unwrap_err(), SnapshotError::MissingCommitment);

        let mut bad_hash = snapshot;
        bad_hash.moves_commitment = Some("zz".to_string());
        assert_eq!(GameSession::restore(&bad_hash).unwrap_err(), SnapshotError::InvalidHash);
    }

    #[test]
    fn test_restore_rejects_tampered_log() {
        let mut snapshot = played_session(6).snapshot().unwrap();
        snapshot.move_log[0] = (snapshot.move_log[0] + 1) % 4;
        assert_eq!(GameSession::restore(&snapshot).unwrap_err(), SnapshotError::CommitmentMismatch);

        let mut bad_code = played_session(2).snapshot().unwrap();
        bad_code.move_log[0] = 9;
        assert_eq!(GameSession::restore(&bad_code).unwrap_err(), SnapshotError::InvalidMoveCode(9));
    }

    #[test]
    fn test_restore_rejects_overlapping_tiles() {
        let mut snapshot = played_session(2).snapshot().unwrap();
        let mut dup = snapshot.tiles[0];
        dup.id = 999;
        snapshot.tiles.push(dup);
        assert!(matches!(GameSession::restore(&snapshot), Err(SnapshotError::InvalidTiles(_))));
    }

    #[test]
    fn test_restore_resumes_tile_ids() {
        let snapshot = played_session(5).snapshot().unwrap();
        let restored = GameSession::restore(&snapshot).unwrap();
        let max_id = snapshot.tiles.iter().map(|t| t.id).max().unwrap();
        assert_eq!(restored.next_tile_id, max_id + 1);
        assert_eq!(restored.next_tile_id, (INITIAL_TILES + 5 + 1) as TileId);
    }

    #[test]
    fn test_restore_rejects_bad_tile_ids() {
        let snapshot = played_session(5).snapshot().unwrap();

        let mut huge = snapshot.clone();
        huge.tiles[0].id = TileId::MAX;
        assert!(matches!(GameSession::restore(&huge), Err(SnapshotError::InvalidTiles(_))));

        let mut unminted = snapshot.clone();
        unminted.tiles[0].id = (INITIAL_TILES + 5 + 1) as TileId;
        assert!(matches!(GameSession::restore(&unminted), Err(SnapshotError::InvalidTiles(_))));

        let mut repeated = snapshot;
        repeated.tiles[1].id = repeated.tiles[0].id;
        assert!(matches!(GameSession::restore(&repeated), Err(SnapshotError::InvalidTiles(_))));
    }

    #[test]
    fn test_resume_discards_huge_tile_id() {
        let inputs = SeedInputs::new(RANDOMNESS, None, 7);
        let mut snapshot = played_session(5).snapshot().unwrap();
        snapshot.tiles[0].id = TileId::MAX;

        let session = resume_or_start(Some(&snapshot), &inputs).unwrap();
        assert!(session.move_log().is_empty());
        assert_eq!(session.seed(), inputs.derive_seed().unwrap());
    }

    #[test]
    fn test_restore_rejects_foreign_seed() {
        let mut snapshot = played_session(4).snapshot().unwrap();
        snapshot.identifier = Some("0xsomeone-else".to_string());
        assert_eq!(GameSession::restore(&snapshot).unwrap_err(), SnapshotError::SeedMismatch);

        let mut shifted = played_session(4).snapshot().unwrap();
        shifted.start_time = shifted.start_time.map(|t| t + 1);
        assert_eq!(GameSession::restore(&shifted).unwrap_err(), SnapshotError::SeedMismatch);
    }

    #[test]
    fn test_restore_raw_seed_session() {
        let mut session = GameSession::from_seed("abc");
        session.apply_player_move(Direction::Left).unwrap();
        let snapshot = session.snapshot().unwrap();
        assert!(snapshot.randomness.is_none());

        let restored = GameSession::restore(&snapshot).unwrap();
        assert_eq!(restored.origin(), None);
        assert_eq!(restored.draws_consumed(), 6);
    }

    #[test]
    fn test_snapshot_refused_while_pending() {
        let mut session = played_session(0);
        Direction::ALL.into_iter().find_map(|d| session.slide(d).unwrap()).unwrap();
        assert!(matches!(session.snapshot(), Err(SessionError::SpawnPending { .. })));
    }

    #[test]
    fn test_resume_or_start_falls_back() {
        let inputs = SeedInputs::new(RANDOMNESS, None, 99);

        let mut broken = played_session(4).snapshot().unwrap();
        broken.seed = None;
        let session = resume_or_start(Some(&broken), &inputs).unwrap();
        assert!(session.move_log().is_empty());
        assert_eq!(session.seed(), inputs.derive_seed().unwrap());

        let good = played_session(4).snapshot().unwrap();
        let session = resume_or_start(Some(&good), &inputs).unwrap();
        assert_eq!(session.move_log().len(), 4);

        let session = resume_or_start(None, &inputs).unwrap();
        assert!(session.move_log().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(SessionSnapshot::from_json("{not json"), Err(SnapshotError::Malformed(_))));
    }
}
