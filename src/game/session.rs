//! Game Session
//!
//! Owns one game: seed, generator, tiles, score, move log and commitment.
//! Nothing is shared between sessions; starting a new game builds a new
//! generator from its own seed.
//!
//! A move is two steps, `slide` then `settle`. The slide is applied and
//! committed at once; the spawn that follows is held as a pending ticket so
//! a caller can animate in between. A ticket from a superseded session is
//! refused, never applied to the new state.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{DRAWS_PER_SPAWN, INITIAL_TILES, TWO_PROBABILITY};
use crate::core::hash::{to_hex, Hash32};
use crate::core::rng::{DeterministicRandom, SeedError, SeedInputs};
use crate::game::grid::{apply_move, is_terminal, MergeEvent};
use crate::game::tile::{Board, Direction, Tile, TileId};
use crate::proof::commitment::MoveCommitment;

/// Where a derived seed came from. Absent for sessions built from a raw seed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOrigin {
    /// Raw randomness from the seed source.
    pub randomness: [u8; 32],
    /// Player identifier, `None` when anonymous.
    pub identifier: Option<String>,
    /// Session start time, epoch milliseconds.
    pub start_time: i64,
}

/// Handle for the spawn owed by an accepted slide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnTicket {
    /// Session that issued the ticket.
    pub session_id: Uuid,
    /// Index of the move in the log that owes the spawn.
    pub move_index: usize,
}

/// An accepted slide waiting for its spawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMove {
    /// Ticket to pass to `settle`.
    pub ticket: SpawnTicket,
    /// Points earned by the slide.
    pub score_delta: u64,
    /// Merges performed.
    pub merges: Vec<MergeEvent>,
    /// Tiles consumed by merges.
    pub consumed: Vec<Tile>,
}

/// Outcome of a full player move.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Whether the move was accepted.
    pub moved: bool,
    /// Points earned.
    pub score_delta: u64,
    /// Merges performed.
    pub merges: Vec<MergeEvent>,
    /// Tiles consumed by merges.
    pub consumed: Vec<Tile>,
    /// Tile spawned after the slide.
    pub spawned: Option<Tile>,
    /// Whether the game ended with this move.
    pub is_over: bool,
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A slide is waiting for its spawn.
    #[error("Spawn pending for move {move_index}")]
    SpawnPending {
        /// Move that owes the spawn.
        move_index: usize,
    },

    /// Ticket does not belong to the current pending spawn.
    #[error("Stale spawn ticket")]
    StaleSpawn,
}

/// A single game.
#[derive(Debug)]
pub struct GameSession {
    pub(crate) id: Uuid,
    pub(crate) seed: String,
    pub(crate) origin: Option<SeedOrigin>,
    pub(crate) rng: DeterministicRandom,
    pub(crate) tiles: Vec<Tile>,
    pub(crate) score: u64,
    pub(crate) move_log: Vec<Direction>,
    pub(crate) commitment: MoveCommitment,
    pub(crate) is_over: bool,
    pub(crate) next_tile_id: TileId,
    pub(crate) pending: Option<SpawnTicket>,
}

impl GameSession {
    /// Start a session from seed source data.
    pub fn start(inputs: &SeedInputs) -> Result<Self, SeedError> {
        let randomness = inputs.randomness_bytes()?;
        let seed = inputs.derive_seed()?;
        let mut session = Self::blank(seed, Some(SeedOrigin {
            randomness,
            identifier: inputs.identifier.clone(),
            start_time: inputs.start_time,
        }));
        session.spawn_initial();

        info!(
            "Session {} started, seed {}..",
            session.id,
            &session.seed[..session.seed.len().min(16)]
        );
        Ok(session)
    }

    /// Start a session from a raw seed string.
    pub fn from_seed(seed: impl Into<String>) -> Self {
        let mut session = Self::blank(seed.into(), None);
        session.spawn_initial();
        session
    }

    /// Replace this session with a brand-new game.
    ///
    /// Any pending spawn is dropped. On error the current game is left as is.
    pub fn restart(&mut self, inputs: &SeedInputs) -> Result<(), SeedError> {
        let next = Self::start(inputs)?;
        if let Some(ticket) = self.pending {
            debug!("Discarding pending spawn for move {}", ticket.move_index);
        }
        *self = next;
        Ok(())
    }

    /// Session with no tiles yet and a fresh generator.
    pub(crate) fn blank(seed: String, origin: Option<SeedOrigin>) -> Self {
        let rng = DeterministicRandom::new(&seed);
        Self {
            id: Uuid::new_v4(),
            seed,
            origin,
            rng,
            tiles: Vec::new(),
            score: 0,
            move_log: Vec::new(),
            commitment: MoveCommitment::new(),
            is_over: false,
            next_tile_id: 1,
            pending: None,
        }
    }

    fn spawn_initial(&mut self) {
        for _ in 0..INITIAL_TILES {
            self.spawn_tile();
        }
        self.is_over = is_terminal(&self.tiles);
    }

    // =========================================================================
    // Moves
    // =========================================================================

    /// Apply a move and its spawn in one step.
    ///
    /// A move that changes nothing, or a move after game over, is a no-op.
    pub fn apply_player_move(&mut self, direction: Direction) -> Result<MoveOutcome, SessionError> {
        let Some(pending) = self.slide(direction)? else {
            return Ok(MoveOutcome {
                is_over: self.is_over,
                ..MoveOutcome::default()
            });
        };

        let spawned = self.settle(pending.ticket)?;
        Ok(MoveOutcome {
            moved: true,
            score_delta: pending.score_delta,
            merges: pending.merges,
            consumed: pending.consumed,
            spawned,
            is_over: self.is_over,
        })
    }

    /// Slide the tiles and commit the move, leaving the spawn pending.
    ///
    /// Returns `None` when the move does not change the grid or the game is over.
    pub fn slide(&mut self, direction: Direction) -> Result<Option<PendingMove>, SessionError> {
        if let Some(ticket) = self.pending {
            return Err(SessionError::SpawnPending { move_index: ticket.move_index });
        }
        if self.is_over {
            return Ok(None);
        }

        let result = apply_move(&self.tiles, direction);
        if !result.moved {
            return Ok(None);
        }

        self.tiles = result.tiles;
        self.score += result.score_delta;
        self.move_log.push(direction);
        self.commitment.push(direction);

        let ticket = SpawnTicket {
            session_id: self.id,
            move_index: self.move_log.len() - 1,
        };
        self.pending = Some(ticket);

        debug!(
            "Move {} {:?}: +{} (score {})",
            ticket.move_index, direction, result.score_delta, self.score
        );

        Ok(Some(PendingMove {
            ticket,
            score_delta: result.score_delta,
            merges: result.merges,
            consumed: result.consumed,
        }))
    }

    /// Perform the spawn owed by `ticket`.
    pub fn settle(&mut self, ticket: SpawnTicket) -> Result<Option<Tile>, SessionError> {
        if self.pending != Some(ticket) {
            return Err(SessionError::StaleSpawn);
        }
        self.pending = None;

        let spawned = self.spawn_tile();
        if is_terminal(&self.tiles) {
            self.is_over = true;
            info!(
                "Session {} over after {} moves, score {}",
                self.id,
                self.move_log.len(),
                self.score
            );
        }
        Ok(spawned)
    }

    /// Place one tile in a random empty cell. Consumes two draws.
    ///
    /// An accepted slide always leaves an empty cell, so the full-board
    /// branch never draws and never runs during play.
    fn spawn_tile(&mut self) -> Option<Tile> {
        let empty = Board::from_tiles(&self.tiles).empty_cells();
        if empty.is_empty() {
            return None;
        }

        let (row, col) = empty[self.rng.next_index(empty.len())];
        let value = if self.rng.next_f64() < TWO_PROBABILITY { 2 } else { 4 };

        let tile = Tile::spawned(self.next_tile_id, value, row, col);
        self.next_tile_id += 1;
        self.tiles.push(tile);
        Some(tile)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Session identity (not part of the game state).
    pub fn session_id(&self) -> Uuid {
        self.id
    }

    /// Seed string.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Seed source data, when the seed was derived.
    pub fn origin(&self) -> Option<&SeedOrigin> {
        self.origin.as_ref()
    }

    /// Session start time, when the seed was derived.
    pub fn start_time(&self) -> Option<i64> {
        self.origin.as_ref().map(|o| o.start_time)
    }

    /// Seed source randomness, when the seed was derived.
    pub fn randomness(&self) -> Option<&[u8; 32]> {
        self.origin.as_ref().map(|o| &o.randomness)
    }

    /// Current tiles.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Value view of the tiles.
    pub fn board(&self) -> Board {
        Board::from_tiles(&self.tiles)
    }

    /// Accumulated score.
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Accepted moves, in order.
    pub fn move_log(&self) -> &[Direction] {
        &self.move_log
    }

    /// Current commitment over the move log.
    pub fn commitment(&self) -> Hash32 {
        self.commitment.hash()
    }

    /// Commitment as hex.
    pub fn commitment_hex(&self) -> String {
        to_hex(&self.commitment.hash())
    }

    /// Whether the game has ended.
    pub fn is_over(&self) -> bool {
        self.is_over
    }

    /// Whether a spawn is owed.
    pub fn has_pending_spawn(&self) -> bool {
        self.pending.is_some()
    }

    /// Largest tile on the grid.
    pub fn max_tile(&self) -> u32 {
        self.board().max_tile()
    }

    /// Generator draws consumed so far.
    pub fn draws_consumed(&self) -> u64 {
        self.rng.draws()
    }

    /// Draws a settled session with `moves` accepted moves has consumed.
    pub fn expected_draws(moves: usize) -> u64 {
        ((INITIAL_TILES + moves) * DRAWS_PER_SPAWN) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::commitment::commit_moves;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const RANDOMNESS: &str = "0x8f3a1c52d0b4e6f7a9b8c7d6e5f40312a1b2c3d4e5f60718293a4b5c6d7e8f90";

    fn random_moves(seed: u64, count: usize) -> Vec<Direction> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| Direction::from_code(rng.gen_range(0..4)).unwrap())
            .collect()
    }

    fn play(seed: &str, moves: &[Direction]) -> GameSession {
        let mut session = GameSession::from_seed(seed);
        for m in moves {
            session.apply_player_move(*m).unwrap();
        }
        session
    }

    /// Play until `count` moves have been accepted, trying directions in order.
    fn play_accepted(seed: &str, count: usize) -> GameSession {
        let mut session = GameSession::from_seed(seed);
        while session.move_log().len() < count && !session.is_over() {
            for dir in Direction::ALL {
                if session.apply_player_move(dir).unwrap().moved {
                    break;
                }
            }
        }
        session
    }

    #[test]
    fn test_start_spawns_two_tiles() {
        let session = GameSession::from_seed("abc");

        assert_eq!(session.tiles().len(), 2);
        assert_eq!(session.score(), 0);
        assert!(session.move_log().is_empty());
        assert_eq!(session.commitment(), [0u8; 32]);
        assert!(!session.is_over());
        assert!(session.tiles().iter().all(|t| t.value == 2 || t.value == 4));
        assert!(session.tiles().iter().all(|t| t.just_spawned));
        assert_ne!(session.tiles()[0].cell(), session.tiles()[1].cell());
    }

    #[test]
    fn test_origin_accessors() {
        let inputs = SeedInputs::new(RANDOMNESS, None, 1_234);
        let session = GameSession::start(&inputs).unwrap();
        assert_eq!(session.start_time(), Some(1_234));
        assert_eq!(session.randomness(), Some(&inputs.randomness_bytes().unwrap()));

        let raw = GameSession::from_seed("abc");
        assert_eq!(raw.start_time(), None);
        assert_eq!(raw.randomness(), None);
    }

    #[test]
    fn test_start_consumes_four_draws() {
        let session = GameSession::from_seed("draws");
        assert_eq!(session.draws_consumed(), 4);
    }

    #[test]
    fn test_move_consumes_two_draws() {
        let session = play_accepted("draws", 1);
        assert_eq!(session.move_log().len(), 1);
        assert_eq!(session.draws_consumed(), 6);
    }

    #[test]
    fn test_draw_count_matches_formula() {
        let session = play_accepted("formula", 40);
        assert_eq!(session.draws_consumed(), GameSession::expected_draws(session.move_log().len()));
    }

    #[test]
    fn test_spawn_follows_generator() {
        let session = GameSession::from_seed("spawn");
        let mut rng = DeterministicRandom::new("spawn");

        let first_idx = rng.next_index(16);
        let first_val = if rng.next_f64() < 0.9 { 2 } else { 4 };
        let second_idx = rng.next_index(15);
        let second_val = if rng.next_f64() < 0.9 { 2 } else { 4 };

        let first = session.tiles()[0];
        assert_eq!(first.cell(), first_idx);
        assert_eq!(first.value, first_val);

        // Second pick indexes the remaining empty cells in row-major order.
        let second_cell = if second_idx >= first_idx { second_idx + 1 } else { second_idx };
        assert_eq!(session.tiles()[1].cell(), second_cell);
        assert_eq!(session.tiles()[1].value, second_val);
    }

    #[test]
    fn test_unmoved_move_is_noop() {
        let mut session = GameSession::from_seed("noop");
        session.tiles = vec![Tile::spawned(1, 2, 0, 0), Tile::spawned(2, 4, 0, 1)];
        let draws = session.draws_consumed();

        let outcome = session.apply_player_move(Direction::Left).unwrap();
        assert!(!outcome.moved);
        assert!(session.move_log().is_empty());
        assert_eq!(session.commitment(), [0u8; 32]);
        assert_eq!(session.draws_consumed(), draws);

        let outcome = session.apply_player_move(Direction::Up).unwrap();
        assert!(!outcome.moved);
    }

    #[test]
    fn test_accepted_move_updates_state() {
        let mut session = GameSession::from_seed("accept");
        session.tiles = vec![Tile::spawned(1, 2, 0, 2), Tile::spawned(2, 2, 0, 3)];
        session.next_tile_id = 3;

        let outcome = session.apply_player_move(Direction::Left).unwrap();
        assert!(outcome.moved);
        assert_eq!(outcome.score_delta, 4);
        assert_eq!(session.score(), 4);
        assert_eq!(session.move_log(), &[Direction::Left]);
        assert_eq!(session.commitment(), commit_moves(&[Direction::Left]));
        assert_eq!(session.tiles().len(), 2);

        let spawned = outcome.spawned.unwrap();
        assert_eq!(spawned.id, 3);
        assert!(spawned.just_spawned);
    }

    #[test]
    fn test_tile_ids_unique_and_monotonic() {
        let session = play(&"ids".repeat(3), &random_moves(7, 200));
        let mut ids: Vec<TileId> = session.tiles().iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), session.tiles().len());
        assert!(ids.iter().all(|id| *id < session.next_tile_id));
    }

    #[test]
    fn test_separate_sessions_independent() {
        let mut a = GameSession::from_seed("same");
        let b = GameSession::from_seed("same");
        for m in random_moves(1, 20) {
            a.apply_player_move(m).unwrap();
        }
        let fresh = GameSession::from_seed("same");
        assert_eq!(b.tiles(), fresh.tiles());
        assert_eq!(b.draws_consumed(), 4);
    }

    #[test]
    fn test_determinism_random_games() {
        for game in 0..20u64 {
            let moves = random_moves(game, 300);
            let seed = format!("game-{}", game);
            let a = play(&seed, &moves);
            let b = play(&seed, &moves);

            assert_eq!(a.tiles(), b.tiles());
            assert_eq!(a.score(), b.score());
            assert_eq!(a.commitment(), b.commitment());
            assert_eq!(a.move_log(), b.move_log());
        }
    }

    #[test]
    fn test_game_over_and_moves_ignored() {
        let mut session = GameSession::from_seed("over");
        let mut tiles = Vec::new();
        for r in 0..4u8 {
            for c in 0..4u8 {
                let value = if (r + c) % 2 == 0 { 2 } else { 4 };
                tiles.push(Tile::spawned((r * 4 + c) as TileId + 1, value, r, c));
            }
        }
        session.tiles = tiles;
        session.is_over = is_terminal(&session.tiles);
        assert!(session.is_over());

        let outcome = session.apply_player_move(Direction::Left).unwrap();
        assert!(!outcome.moved);
        assert!(outcome.is_over);
        assert!(session.move_log().is_empty());
    }

    #[test]
    fn test_slide_then_settle() {
        let mut session = GameSession::from_seed("two-phase");
        let pending = Direction::ALL
            .into_iter()
            .find_map(|d| session.slide(d).unwrap())
            .unwrap();

        assert!(session.has_pending_spawn());
        assert_eq!(session.move_log().len(), 1);
        assert_eq!(session.draws_consumed(), 4);

        // Second slide is refused while the spawn is owed.
        let err = session.slide(Direction::Up).unwrap_err();
        assert_eq!(err, SessionError::SpawnPending { move_index: 0 });

        let spawned = session.settle(pending.ticket).unwrap();
        assert!(spawned.is_some());
        assert_eq!(session.draws_consumed(), 6);
        assert!(!session.has_pending_spawn());

        // Ticket cannot be used twice.
        assert_eq!(session.settle(pending.ticket), Err(SessionError::StaleSpawn));
    }

    #[test]
    fn test_foreign_ticket_refused() {
        let mut a = GameSession::from_seed("foreign");
        let mut b = GameSession::from_seed("foreign");
        let pending_a = Direction::ALL.into_iter().find_map(|d| a.slide(d).unwrap()).unwrap();
        let _pending_b = Direction::ALL.into_iter().find_map(|d| b.slide(d).unwrap()).unwrap();

        assert_eq!(b.settle(pending_a.ticket), Err(SessionError::StaleSpawn));
        assert!(b.has_pending_spawn());
    }

    #[test]
    fn test_restart_discards_pending_spawn() {
        let inputs = SeedInputs::new(RANDOMNESS, None, 1_700_000_000_000);
        let mut session = GameSession::start(&inputs).unwrap();

        let pending = Direction::ALL
            .into_iter()
            .find_map(|d| session.slide(d).unwrap())
            .unwrap();

        let later = SeedInputs::new(RANDOMNESS, None, 1_700_000_000_500);
        session.restart(&later).unwrap();
        let tiles_after_restart = session.tiles().to_vec();

        assert_eq!(session.settle(pending.ticket), Err(SessionError::StaleSpawn));
        assert_eq!(session.tiles(), &tiles_after_restart[..]);
        assert!(session.move_log().is_empty());
        assert_eq!(session.draws_consumed(), 4);
    }

    #[test]
    fn test_restart_failure_keeps_game() {
        let inputs = SeedInputs::new(RANDOMNESS, None, 1);
        let mut session = GameSession::start(&inputs).unwrap();
        let seed = session.seed().to_string();

        let bad = SeedInputs::new("0x1234", None, 2);
        assert_eq!(session.restart(&bad), Err(SeedError::WrongRandomnessLength(2)));
        assert_eq!(session.seed(), seed);
    }

    #[test]
    fn test_start_rejects_malformed_seed_source() {
        assert!(GameSession::start(&SeedInputs::new("", None, 1)).is_err());
        assert!(GameSession::start(&SeedInputs::new("0xnothex", None, 1)).is_err());
    }

    #[test]
    fn test_start_records_origin() {
        let inputs = SeedInputs::new(RANDOMNESS, Some("0xabc".to_string()), 42);
        let session = GameSession::start(&inputs).unwrap();
        let origin = session.origin().unwrap();

        assert_eq!(session.seed(), inputs.derive_seed().unwrap());
        assert_eq!(origin.start_time, 42);
        assert_eq!(origin.identifier.as_deref(), Some("0xabc"));
    }
}
