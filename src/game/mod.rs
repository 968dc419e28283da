//! Game Logic Module
//!
//! The grid engine and the session that drives it. 100% deterministic
//! apart from the session id.
//!
//! ## Module Structure
//!
//! - `tile`: Tiles, directions, board view
//! - `grid`: Slide/merge transition and terminal check
//! - `session`: One game: seed, spawns, score, move log, commitment
//! - `snapshot`: Persisted session state and restore

pub mod tile;
pub mod grid;
pub mod session;
pub mod snapshot;

// Re-export key types
pub use tile::{Tile, TileId, Direction, Board, parse_moves, format_moves};
pub use grid::{apply_move, is_terminal, MoveResult, MergeEvent};
pub use session::{GameSession, MoveOutcome, PendingMove, SpawnTicket, SessionError, SeedOrigin};
pub use snapshot::{SessionSnapshot, SnapshotError, resume_or_start};
