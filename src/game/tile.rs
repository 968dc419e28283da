//! Tile, Direction and Board Definitions
//!
//! A session owns its tiles outright; the `Board` is a derived value view
//! rebuilt from the tile set whenever it is needed.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::{GRID_SIZE, CELL_COUNT};

/// Unique tile identifier, assigned from a per-session counter.
pub type TileId = u64;

// =============================================================================
// DIRECTION (MoveCode)
// =============================================================================

/// Move direction. The discriminant is the wire code of the move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// Code 0
    Up = 0,
    /// Code 1
    Right = 1,
    /// Code 2
    Down = 2,
    /// Code 3
    Left = 3,
}

impl Direction {
    /// All directions in code order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    /// Wire code (0-3).
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Get direction from its wire code.
    pub fn from_code(code: u8) -> Option<Direction> {
        match code {
            0 => Some(Direction::Up),
            1 => Some(Direction::Right),
            2 => Some(Direction::Down),
            3 => Some(Direction::Left),
            _ => None,
        }
    }

    /// Parse a single-letter direction (`U`, `R`, `D`, `L`, any case).
    pub fn from_char(c: char) -> Option<Direction> {
        match c.to_ascii_uppercase() {
            'U' => Some(Direction::Up),
            'R' => Some(Direction::Right),
            'D' => Some(Direction::Down),
            'L' => Some(Direction::Left),
            _ => None,
        }
    }

    /// Single-letter form.
    pub fn as_char(self) -> char {
        match self {
            Direction::Up => 'U',
            Direction::Right => 'R',
            Direction::Down => 'D',
            Direction::Left => 'L',
        }
    }

    /// Number of clockwise quarter turns that turn this direction into `Left`.
    #[inline]
    pub(crate) fn quarter_turns_to_left(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Down => 1,
            Direction::Right => 2,
            Direction::Up => 3,
        }
    }
}

/// Parse a move string such as `"LURD"`. Whitespace and commas are ignored.
///
/// Returns the offending character on failure.
pub fn parse_moves(s: &str) -> Result<Vec<Direction>, char> {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| Direction::from_char(c).ok_or(c))
        .collect()
}

/// Render a move log as a move string.
pub fn format_moves(moves: &[Direction]) -> String {
    moves.iter().map(|d| d.as_char()).collect()
}

// =============================================================================
// TILE
// =============================================================================

/// A single tile on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    /// Unique id within the session
    pub id: TileId,
    /// Tile value, a power of two >= 2
    pub value: u32,
    /// Row 0..3
    pub row: u8,
    /// Column 0..3
    pub col: u8,
    /// Spawned by the most recent spawn
    pub just_spawned: bool,
    /// Produced by a merge in the most recent move
    pub just_merged: bool,
}

impl Tile {
    /// Create a freshly spawned tile.
    pub fn spawned(id: TileId, value: u32, row: u8, col: u8) -> Self {
        Self {
            id,
            value,
            row,
            col,
            just_spawned: true,
            just_merged: false,
        }
    }

    /// Row-major cell index.
    #[inline]
    pub fn cell(&self) -> usize {
        self.row as usize * GRID_SIZE + self.col as usize
    }
}

// =============================================================================
// BOARD VIEW
// =============================================================================

/// 4x4 value view of a tile set, `0` for an empty cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board(pub [[u32; GRID_SIZE]; GRID_SIZE]);

impl Board {
    /// Empty board.
    pub const EMPTY: Board = Board([[0; GRID_SIZE]; GRID_SIZE]);

    /// Build the view from a tile set. Tiles off the grid are left out.
    pub fn from_tiles(tiles: &[Tile]) -> Self {
        let mut cells = [[0; GRID_SIZE]; GRID_SIZE];
        for tile in tiles {
            if let Some(cell) = cells
                .get_mut(tile.row as usize)
                .and_then(|row| row.get_mut(tile.col as usize))
            {
                *cell = tile.value;
            }
        }
        Board(cells)
    }

    /// Value at (row, col), `0` when empty.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.0[row][col]
    }

    /// Values in row-major order.
    pub fn values(&self) -> [u32; CELL_COUNT] {
        let mut out = [0; CELL_COUNT];
        for (i, v) in self.0.iter().flatten().enumerate() {
            out[i] = *v;
        }
        out
    }

    /// Empty cells as (row, col), in row-major order.
    pub fn empty_cells(&self) -> Vec<(u8, u8)> {
        (0..GRID_SIZE)
            .flat_map(|r| (0..GRID_SIZE).map(move |c| (r, c)))
            .filter(|&(r, c)| self.0[r][c] == 0)
            .map(|(r, c)| (r as u8, c as u8))
            .collect()
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.0.iter().flatten().filter(|v| **v != 0).count()
    }

    /// Largest tile value (0 on an empty board).
    pub fn max_tile(&self) -> u32 {
        self.0.iter().flatten().copied().max().unwrap_or(0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.0 {
            let line: Vec<String> = row
                .iter()
                .map(|v| if *v == 0 { format!("{:>6}", ".") } else { format!("{:>6}", v) })
                .collect();
            writeln!(f, "{}", line.join(""))?;
        }
        Ok(())
    }
}
