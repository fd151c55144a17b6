/*!
This module holds the static piece definitions: base shape matrices, the 90°
matrix rotation producing the four rotation states, wall-kick offset tables
and spawn placement.
*/

use crate::{Offset, PieceType, Rotation};

/// A square shape matrix in a fixed 4×4 carrier; 3×3 pieces only use the
/// upper-left 3×3 cells. Row-major, rows growing downward.
pub type ShapeGrid = [[bool; 4]; 4];

/// The side length of the bounding box of a piece type's shape matrix.
pub const fn shape_size(piece_type: PieceType) -> usize {
    match piece_type {
        PieceType::I | PieceType::O => 4,
        _ => 3,
    }
}

/// The base (spawn-state) shape matrix of a piece type.
///
/// 'O' occupies the center of its 4×4 carrier so that every 90° matrix
/// rotation maps its footprint onto itself.
#[rustfmt::skip]
pub const fn base_shape(piece_type: PieceType) -> ShapeGrid {
    const O: bool = false;
    const X: bool = true;
    match piece_type {
        PieceType::O => [
            [O, O, O, O],
            [O, X, X, O],
            [O, X, X, O],
            [O, O, O, O],
        ],
        PieceType::I => [
            [O, O, O, O],
            [X, X, X, X],
            [O, O, O, O],
            [O, O, O, O],
        ],
        PieceType::S => [
            [O, X, X, O],
            [X, X, O, O],
            [O, O, O, O],
            [O, O, O, O],
        ],
        PieceType::Z => [
            [X, X, O, O],
            [O, X, X, O],
            [O, O, O, O],
            [O, O, O, O],
        ],
        PieceType::T => [
            [O, X, O, O],
            [X, X, X, O],
            [O, O, O, O],
            [O, O, O, O],
        ],
        PieceType::L => [
            [O, O, X, O],
            [X, X, X, O],
            [O, O, O, O],
            [O, O, O, O],
        ],
        PieceType::J => [
            [X, O, O, O],
            [X, X, X, O],
            [O, O, O, O],
            [O, O, O, O],
        ],
    }
}

/// Rotates a shape matrix by 90° clockwise within its bounding box
/// (transpose followed by row reversal).
pub const fn rotated_cw(shape: ShapeGrid, size: usize) -> ShapeGrid {
    let mut out = [[false; 4]; 4];
    let mut r = 0;
    while r < size {
        let mut c = 0;
        while c < size {
            out[c][size - 1 - r] = shape[r][c];
            c += 1;
        }
        r += 1;
    }
    out
}

/// The shape matrix of a piece type in a given rotation state, derived from
/// the base matrix by repeated clockwise rotation.
pub const fn shape(piece_type: PieceType, rotation: Rotation) -> ShapeGrid {
    let size = shape_size(piece_type);
    let mut grid = base_shape(piece_type);
    let mut turns = rotation as usize;
    while turns > 0 {
        grid = rotated_cw(grid, size);
        turns -= 1;
    }
    grid
}

/// The four occupied cells of a piece type's shape in a given rotation
/// state, as offsets from the bounding box's top-left corner.
pub const fn shape_cells(piece_type: PieceType, rotation: Rotation) -> [Offset; 4] {
    let grid = shape(piece_type, rotation);
    let size = shape_size(piece_type);
    let mut cells = [(0, 0); 4];
    let mut i = 0;
    let mut r = 0;
    while r < size {
        let mut c = 0;
        while c < size {
            if grid[r][c] {
                cells[i] = (c as i32, r as i32);
                i += 1;
            }
            c += 1;
        }
        r += 1;
    }
    cells
}

/// Where a freshly spawned piece's bounding box is placed: horizontally
/// centered for its matrix size, flush with the top of the grid.
pub const fn spawn_position(piece_type: PieceType, board_width: usize) -> Offset {
    ((board_width as i32 - shape_size(piece_type) as i32) / 2, 0)
}

// Wall-kick candidate offsets, `(dx, dy)` with y growing downward. Rows are
// indexed by (from-rotation, direction) via `kick_row`; the in-place (0, 0)
// candidate leads every list so a free rotation needs no special case.
#[rustfmt::skip]
static KICKS_JLSTZ: [[Offset; 5]; 8] = [
    [(0, 0), (-1, 0), (-1, -1), (0,  2), (-1,  2)], // R0 -> R1
    [(0, 0), ( 1, 0), ( 1,  1), (0, -2), ( 1, -2)], // R1 -> R0
    [(0, 0), ( 1, 0), ( 1,  1), (0, -2), ( 1, -2)], // R1 -> R2
    [(0, 0), (-1, 0), (-1, -1), (0,  2), (-1,  2)], // R2 -> R1
    [(0, 0), ( 1, 0), ( 1, -1), (0,  2), ( 1,  2)], // R2 -> R3
    [(0, 0), (-1, 0), (-1,  1), (0, -2), (-1, -2)], // R3 -> R2
    [(0, 0), (-1, 0), (-1,  1), (0, -2), (-1, -2)], // R3 -> R0
    [(0, 0), ( 1, 0), ( 1, -1), (0,  2), ( 1,  2)], // R0 -> R3
];

#[rustfmt::skip]
static KICKS_I: [[Offset; 5]; 8] = [
    [(0, 0), (-2, 0), ( 1, 0), (-2,  1), ( 1, -2)], // R0 -> R1
    [(0, 0), ( 2, 0), (-1, 0), ( 2, -1), (-1,  2)], // R1 -> R0
    [(0, 0), (-1, 0), ( 2, 0), (-1, -2), ( 2,  1)], // R1 -> R2
    [(0, 0), ( 1, 0), (-2, 0), ( 1,  2), (-2, -1)], // R2 -> R1
    [(0, 0), ( 2, 0), (-1, 0), ( 2, -1), (-1,  2)], // R2 -> R3
    [(0, 0), (-2, 0), ( 1, 0), (-2,  1), ( 1, -2)], // R3 -> R2
    [(0, 0), ( 1, 0), (-2, 0), ( 1,  2), (-2, -1)], // R3 -> R0
    [(0, 0), (-1, 0), ( 2, 0), (-1, -2), ( 2,  1)], // R0 -> R3
];

// 'O' never leaves its footprint when rotated, so only the in-place
// candidate is ever needed.
static KICKS_O: [Offset; 1] = [(0, 0)];

const fn kick_row(from: Rotation, clockwise: bool) -> usize {
    match (from, clockwise) {
        (Rotation::R0, true) => 0,
        (Rotation::R1, false) => 1,
        (Rotation::R1, true) => 2,
        (Rotation::R2, false) => 3,
        (Rotation::R2, true) => 4,
        (Rotation::R3, false) => 5,
        (Rotation::R3, true) => 6,
        (Rotation::R0, false) => 7,
    }
}

/// The ordered wall-kick candidates to try when rotating a piece one step
/// from `from` in the given direction.
pub fn kick_offsets(
    piece_type: PieceType,
    from: Rotation,
    clockwise: bool,
) -> &'static [Offset] {
    match piece_type {
        PieceType::O => &KICKS_O,
        PieceType::I => &KICKS_I[kick_row(from, clockwise)],
        _ => &KICKS_JLSTZ[kick_row(from, clockwise)],
    }
}
