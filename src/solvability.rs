//! Inversion-parity solvability predicate.

use crate::board::{idx_to_coord, Board, Cell};

/// Counts ordered pairs `i < j` with `tile[i] > tile[j]`, ignoring the blank.
///
/// Wildcards carry no order and are ignored like the blank.
pub fn count_inversions<const SIDE: usize, const CELLS: usize>(board: &Board<SIDE, CELLS>) -> usize {
    let tiles: Vec<u8> = board
        .cells()
        .iter()
        .filter_map(|cell| match cell {
            Cell::Tile(id) => Some(*id),
            _ => None,
        })
        .collect();

    tiles
        .iter()
        .enumerate()
        .map(|(i, &tile)| tiles[i + 1..].iter().filter(|&&later| later < tile).count())
        .sum()
}

/// The bare parity test: an even inversion count.
///
/// Complete for odd sides only.
pub fn inversion_parity_even<const SIDE: usize, const CELLS: usize>(
    board: &Board<SIDE, CELLS>,
) -> bool {
    count_inversions(board) % 2 == 0
}

/// Whether the board can reach the complete goal.
///
/// Odd sides use inversion parity. Even sides also count the blank's row,
/// numbered from the bottom starting at 1: the sum must be odd.
pub fn is_solvable<const SIDE: usize, const CELLS: usize>(board: &Board<SIDE, CELLS>) -> bool {
    if SIDE % 2 == 1 {
        return inversion_parity_even(board);
    }
    let (blank_row, _) = idx_to_coord::<SIDE>(board.blank());
    let row_from_bottom = SIDE - blank_row;
    (count_inversions(board) + row_from_bottom) % 2 == 1
}
