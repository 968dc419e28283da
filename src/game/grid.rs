//! Grid Transition Engine
//!
//! The pure slide/merge transition. Every direction is reduced to a leftward
//! slide by rotating the grid a number of clockwise quarter turns, running one
//! row algorithm, then rotating back.
//!
//! Nothing here mutates its input: a move builds a new tile list and reports
//! merges as events alongside it.

use crate::GRID_SIZE;
use crate::game::tile::{Board, Direction, Tile, TileId};

/// Cell grid of owned tiles.
type Grid = [[Option<Tile>; GRID_SIZE]; GRID_SIZE];

/// One merge performed during a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeEvent {
    /// Surviving tile (doubled).
    pub winner_id: TileId,
    /// Consumed tile.
    pub loser_id: TileId,
    /// Value of the winner after the merge.
    pub new_value: u32,
}

/// Result of applying a direction to a tile set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveResult {
    /// Tiles after the slide, in row-major order.
    pub tiles: Vec<Tile>,
    /// Tiles consumed by merges, positioned at the cell they merged into.
    pub consumed: Vec<Tile>,
    /// Merge events, in the order they happened.
    pub merges: Vec<MergeEvent>,
    /// Points earned by this move.
    pub score_delta: u64,
    /// Whether the value layout changed.
    pub moved: bool,
}

/// Apply a move to a tile set.
///
/// Merging is scanned from the edge the tiles slide toward; a tile takes
/// part in at most one merge per move.
pub fn apply_move(tiles: &[Tile], direction: Direction) -> MoveResult {
    let before = Board::from_tiles(tiles);

    let turns = direction.quarter_turns_to_left();
    let mut grid = to_grid(tiles);
    for _ in 0..turns {
        grid = rotate_cw(&grid);
    }

    let mut merges = Vec::new();
    let mut score_delta = 0u64;
    for row in grid.iter_mut() {
        let (slid, row_merges) = slide_row_left(row);
        score_delta += row_merges.iter().map(|m| m.new_value as u64).sum::<u64>();
        merges.extend(row_merges);
        *row = slid;
    }

    for _ in 0..(GRID_SIZE - turns) % GRID_SIZE {
        grid = rotate_cw(&grid);
    }

    let new_tiles = from_grid(&grid);
    let consumed = consumed_tiles(tiles, &new_tiles, &merges);
    let moved = Board::from_tiles(&new_tiles) != before;

    MoveResult {
        tiles: new_tiles,
        consumed,
        merges,
        score_delta,
        moved,
    }
}

/// Check whether no move can change the grid.
///
/// True iff every cell is occupied and no two orthogonal neighbours share a value.
pub fn is_terminal(tiles: &[Tile]) -> bool {
    let board = Board::from_tiles(tiles);
    if board.occupied() < crate::CELL_COUNT {
        return false;
    }
    !has_adjacent_pair(&board)
}

fn has_adjacent_pair(board: &Board) -> bool {
    for r in 0..GRID_SIZE {
        for c in 0..GRID_SIZE {
            let v = board.get(r, c);
            if c + 1 < GRID_SIZE && board.get(r, c + 1) == v {
                return true;
            }
            if r + 1 < GRID_SIZE && board.get(r + 1, c) == v {
                return true;
            }
        }
    }
    false
}

// =============================================================================
// Row algorithm
// =============================================================================

/// Slide and merge a single row toward column 0.
fn slide_row_left(row: &[Option<Tile>; GRID_SIZE]) -> ([Option<Tile>; GRID_SIZE], Vec<MergeEvent>) {
    let present: Vec<Tile> = row.iter().flatten().copied().collect();

    let mut merges = Vec::new();
    let mut kept: Vec<Tile> = Vec::with_capacity(present.len());
    let mut i = 0;
    while i < present.len() {
        let tile = present[i];
        match present.get(i + 1) {
            Some(next) if next.value == tile.value => {
                let new_value = tile.value * 2;
                merges.push(MergeEvent {
                    winner_id: tile.id,
                    loser_id: next.id,
                    new_value,
                });
                kept.push(Tile {
                    value: new_value,
                    just_merged: true,
                    just_spawned: false,
                    ..tile
                });
                i += 2;
            }
            _ => {
                kept.push(Tile {
                    just_merged: false,
                    just_spawned: false,
                    ..tile
                });
                i += 1;
            }
        }
    }

    let mut out = [None; GRID_SIZE];
    for (slot, tile) in out.iter_mut().zip(kept) {
        *slot = Some(tile);
    }
    (out, merges)
}

// =============================================================================
// Grid helpers
// =============================================================================

fn to_grid(tiles: &[Tile]) -> Grid {
    let mut grid: Grid = [[None; GRID_SIZE]; GRID_SIZE];
    for tile in tiles {
        if let Some(cell) = grid
            .get_mut(tile.row as usize)
            .and_then(|row| row.get_mut(tile.col as usize))
        {
            *cell = Some(*tile);
        }
    }
    grid
}

/// Quarter turn clockwise: cell (r, c) moves to (c, 3 - r).
fn rotate_cw(grid: &Grid) -> Grid {
    let mut out: Grid = [[None; GRID_SIZE]; GRID_SIZE];
    for (r, row) in grid.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            out[c][GRID_SIZE - 1 - r] = *cell;
        }
    }
    out
}

/// Flatten a grid to tiles, stamping each tile with its cell.
fn from_grid(grid: &Grid) -> Vec<Tile> {
    let mut tiles = Vec::new();
    for (r, row) in grid.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if let Some(tile) = cell {
                tiles.push(Tile {
                    row: r as u8,
                    col: c as u8,
                    ..*tile
                });
            }
        }
    }
    tiles
}

fn consumed_tiles(old: &[Tile], new: &[Tile], merges: &[MergeEvent]) -> Vec<Tile> {
    merges
        .iter()
        .filter_map(|m| {
            let loser = old.iter().find(|t| t.id == m.loser_id)?;
            let winner = new.iter().find(|t| t.id == m.winner_id)?;
            Some(Tile {
                row: winner.row,
                col: winner.col,
                just_spawned: false,
                just_merged: false,
                ..*loser
            })
        })
        .collect()
}
