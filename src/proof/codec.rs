//! Board and Move Log Packing
//!
//! Compact encodings consumed by the settlement layer:
//! - board: 16 nibbles of `log2(value)` in a `u64`, cell (0,0) in the low nibble
//! - moves: 2 bits per move, first move in the low bits, unbounded width

use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

use crate::{CELL_COUNT, GRID_SIZE, MAX_PACKABLE_EXPONENT};
use crate::game::tile::{Board, Direction, Tile};

/// Bits per board cell.
pub const BITS_PER_CELL: u32 = 4;

/// Bits per move.
pub const BITS_PER_MOVE: usize = 2;

/// Packing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Tile value needs more than 4 bits of exponent.
    #[error("Tile value {value} exceeds the packable maximum 2^15")]
    TileOverflow {
        /// Offending value.
        value: u32,
    },

    /// Tile value is not a power of two >= 2.
    #[error("Tile value {value} is not a power of two >= 2")]
    InvalidTileValue {
        /// Offending value.
        value: u32,
    },

    /// Tile lies outside the grid.
    #[error("Tile at ({row}, {col}) is off the grid")]
    InvalidCell {
        /// Tile row.
        row: u8,
        /// Tile column.
        col: u8,
    },

    /// Two tiles share a cell.
    #[error("Two tiles at ({row}, {col})")]
    CellOccupied {
        /// Tile row.
        row: u8,
        /// Tile column.
        col: u8,
    },
}

/// Exponent of a tile value, `0` for an empty cell.
pub fn tile_exponent(value: u32) -> Result<u32, CodecError> {
    if value == 0 {
        return Ok(0);
    }
    if value < 2 || !value.is_power_of_two() {
        return Err(CodecError::InvalidTileValue { value });
    }
    let exp = value.trailing_zeros();
    if exp > MAX_PACKABLE_EXPONENT {
        return Err(CodecError::TileOverflow { value });
    }
    Ok(exp)
}

/// Pack a tile set into a 64-bit board.
///
/// Every tile must sit on its own cell of the grid.
pub fn pack_board(tiles: &[Tile]) -> Result<u64, CodecError> {
    let mut occupied = [false; CELL_COUNT];
    for tile in tiles {
        let (row, col) = (tile.row, tile.col);
        if row as usize >= GRID_SIZE || col as usize >= GRID_SIZE {
            return Err(CodecError::InvalidCell { row, col });
        }
        if std::mem::replace(&mut occupied[tile.cell()], true) {
            return Err(CodecError::CellOccupied { row, col });
        }
    }
    pack_board_values(&Board::from_tiles(tiles))
}

/// Pack a board view into a 64-bit board.
pub fn pack_board_values(board: &Board) -> Result<u64, CodecError> {
    board
        .values()
        .iter()
        .enumerate()
        .try_fold(0u64, |packed, (i, value)| {
            let exp = tile_exponent(*value)? as u64;
            Ok(packed | (exp << (BITS_PER_CELL as usize * i)))
        })
}

/// Unpack a 64-bit board.
pub fn unpack_board(packed: u64) -> Board {
    let mut cells = [[0u32; GRID_SIZE]; GRID_SIZE];
    for i in 0..CELL_COUNT {
        let exp = (packed >> (BITS_PER_CELL as usize * i)) & 0xF;
        if exp != 0 {
            cells[i / GRID_SIZE][i % GRID_SIZE] = 1 << exp;
        }
    }
    Board(cells)
}

// =============================================================================
// MOVE LOG
// =============================================================================

/// Number of bytes needed to store `count` packed moves.
#[inline]
pub fn packed_moves_len(count: usize) -> usize {
    (count * BITS_PER_MOVE).div_ceil(8)
}

/// Packed move log: an arbitrary-width integer plus the move count.
///
/// The count travels with the value because trailing `Up` moves (code 0)
/// are indistinguishable from padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedMoves {
    value: BigUint,
    count: usize,
}

impl PackedMoves {
    /// Rebuild from a little-endian byte encoding.
    pub fn from_bytes_le(bytes: &[u8], count: usize) -> Self {
        Self {
            value: BigUint::from_bytes_le(bytes),
            count,
        }
    }

    /// The packed integer.
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Number of moves.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Little-endian bytes, exactly `ceil(count * 2 / 8)` long.
    pub fn to_bytes_le(&self) -> Vec<u8> {
        let len = packed_moves_len(self.count);
        if self.value.is_zero() {
            return vec![0; len];
        }
        let mut bytes = self.value.to_bytes_le();
        bytes.resize(len.max(bytes.len()), 0);
        bytes
    }

    /// Big-endian hex of the integer, `0x` prefixed.
    pub fn to_hex(&self) -> String {
        format!("0x{}", self.value.to_str_radix(16))
    }

    /// Decode back to directions.
    pub fn unpack(&self) -> Vec<Direction> {
        unpack_moves(&self.value, self.count)
    }
}

/// Pack a move log, 2 bits per move, least significant first.
pub fn pack_moves(moves: &[Direction]) -> PackedMoves {
    let mut bytes = vec![0u8; packed_moves_len(moves.len())];
    for (i, dir) in moves.iter().enumerate() {
        bytes[i / 4] |= dir.code() << (BITS_PER_MOVE * (i % 4));
    }
    PackedMoves::from_bytes_le(&bytes, moves.len())
}

/// Unpack `count` moves from a packed integer.
pub fn unpack_moves(packed: &BigUint, count: usize) -> Vec<Direction> {
    let bytes = packed.to_bytes_le();
    (0..count)
        .map(|i| {
            let byte = bytes.get(i / 4).copied().unwrap_or(0);
            let code = (byte >> (BITS_PER_MOVE * (i % 4))) & 0b11;
            // Two bits always name a direction.
            Direction::from_code(code).unwrap_or(Direction::Up)
        })
        .collect()
}
