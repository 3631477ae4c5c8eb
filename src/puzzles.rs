//! Puzzle definitions, goal catalogue and disjoint pattern partitioning.
//!
//! Each puzzle fixes its board size and a grouping table that splits the
//! real tiles into disjoint pattern groups.

use crate::board::{Board, Cell};
use crate::error::SolveError;

/// Puzzle definition with compile-time parameters.
///
/// - `SIDE`: side length of the square board
/// - `CELLS`: total cells (must equal SIDE^2)
pub struct Puzzle<const SIDE: usize, const CELLS: usize> {
    /// Disjoint tile groups. Together they cover every tile `1..CELLS`.
    pub groups: &'static [&'static [u8]],
}

impl<const SIDE: usize, const CELLS: usize> Puzzle<SIDE, CELLS> {
    /// Creates a puzzle definition with compile-time validation.
    pub const fn new(groups: &'static [&'static [u8]]) -> Self {
        assert!(SIDE * SIDE == CELLS, "CELLS must equal SIDE^2");
        assert!(SIDE >= 2, "SIDE must be at least 2");
        assert!(CELLS <= 64, "CELLS must be <= 64 (u64 label mask)");

        // every tile belongs to exactly one group
        let mut coverage = [0usize; CELLS];
        let mut g = 0;
        while g < groups.len() {
            let mut t = 0;
            while t < groups[g].len() {
                let tile = groups[g][t] as usize;
                assert!(tile >= 1 && tile < CELLS, "group tile out of range");
                coverage[tile] += 1;
                t += 1;
            }
            g += 1;
        }
        let mut tile = 1;
        while tile < CELLS {
            assert!(coverage[tile] == 1, "groups must be disjoint and exhaustive");
            tile += 1;
        }

        Self { groups }
    }

    /// The complete goal: tiles in order, blank in the last cell.
    pub fn goal(&self) -> Board<SIDE, CELLS> {
        self.goal_with(|_| true)
    }

    /// Goal for one group: its tiles at home, other tiles wildcards, blank last.
    pub fn group_goal(&self, group: usize) -> Board<SIDE, CELLS> {
        let members = self.groups[group];
        self.goal_with(|tile| members.contains(&tile))
    }

    fn goal_with(&self, keep: impl Fn(u8) -> bool) -> Board<SIDE, CELLS> {
        let mut cells = [Cell::Blank; CELLS];
        for (idx, cell) in cells.iter_mut().enumerate().take(CELLS - 1) {
            let tile = (idx + 1) as u8;
            *cell = if keep(tile) { Cell::Tile(tile) } else { Cell::Wildcard };
        }
        Board::from_parts(cells, CELLS - 1)
    }

    /// Every goal in the catalogue: the complete goal first, then one per group.
    pub fn goal_catalogue(&self) -> Vec<Board<SIDE, CELLS>> {
        std::iter::once(self.goal())
            .chain((0..self.groups.len()).map(|group| self.group_goal(group)))
            .collect()
    }

    /// Resolves the goal for a board from the set of labels it contains.
    pub fn goal_for(&self, board: &Board<SIDE, CELLS>) -> Result<Board<SIDE, CELLS>, SolveError> {
        let labels = board.labels();
        self.goal_catalogue()
            .into_iter()
            .find(|goal| goal.labels() == labels)
            .ok_or_else(|| SolveError::UnknownPattern { state: board.key() })
    }

    /// Splits a full board into one pattern board per group.
    ///
    /// Tiles in the group and the blank keep their cells; every other tile
    /// becomes a wildcard.
    pub fn partition(&self, board: &Board<SIDE, CELLS>) -> Vec<Board<SIDE, CELLS>> {
        self.groups
            .iter()
            .map(|members| {
                let mut cells = *board.cells();
                for cell in &mut cells {
                    if let Cell::Tile(id) = cell {
                        if !members.contains(id) {
                            *cell = Cell::Wildcard;
                        }
                    }
                }
                Board::from_parts(cells, board.blank())
            })
            .collect()
    }
}

/// 8-puzzle constants.
pub const EIGHT_SIDE: usize = 3;
pub const EIGHT_CELLS: usize = 9;

/// The 3x3 puzzle, split into {1,2,3,4} and {5,6,7,8}.
pub const EIGHT_PUZZLE: Puzzle<EIGHT_SIDE, EIGHT_CELLS> =
    Puzzle::new(&[&[1, 2, 3, 4], &[5, 6, 7, 8]]);

/// 15-puzzle constants.
pub const FIFTEEN_SIDE: usize = 4;
pub const FIFTEEN_CELLS: usize = 16;

/// The 4x4 puzzle, split into three five-tile groups.
pub const FIFTEEN_PUZZLE: Puzzle<FIFTEEN_SIDE, FIFTEEN_CELLS> = Puzzle::new(&[
    &[1, 2, 3, 4, 5],
    &[6, 7, 8, 9, 10],
    &[11, 12, 13, 14, 15],
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_goal_3x3() {
        assert_eq!(EIGHT_PUZZLE.goal().key(), "1,2,3,4,5,6,7,8,0");
    }

    #[test]
    fn test_group_goals_3x3() {
        assert_eq!(EIGHT_PUZZLE.group_goal(0).key(), "1,2,3,4,a,a,a,a,0");
        assert_eq!(EIGHT_PUZZLE.group_goal(1).key(), "a,a,a,a,5,6,7,8,0");
    }

    #[test]
    fn test_goal_matching_ignores_positions() {
        let pattern = Board::<3, 9>::parse("a,4,a,0,3,a,1,2,a").unwrap();
        let goal = EIGHT_PUZZLE.goal_for(&pattern).unwrap();
        assert_eq!(goal.key(), "1,2,3,4,a,a,a,a,0");

        let full = Board::<3, 9>::from_tiles(&[0, 8, 7, 6, 5, 4, 3, 2, 1]).unwrap();
        assert_eq!(EIGHT_PUZZLE.goal_for(&full).unwrap(), EIGHT_PUZZLE.goal());
    }

    #[test]
    fn test_every_4x4_group_resolves_to_its_own_goal() {
        let goals = FIFTEEN_PUZZLE.goal_catalogue();
        assert_eq!(goals.len(), 4);
        for group in 0..FIFTEEN_PUZZLE.groups.len() {
            let pattern = FIFTEEN_PUZZLE.partition(&FIFTEEN_PUZZLE.goal())[group];
            assert_eq!(
                FIFTEEN_PUZZLE.goal_for(&pattern).unwrap(),
                FIFTEEN_PUZZLE.group_goal(group),
                "Group {group} matched the wrong goal"
            );
        }
    }

    #[test]
    fn test_unknown_pattern_is_reported() {
        let mixed = Board::<3, 9>::parse("1,5,a,a,a,a,a,a,0").unwrap();
        assert!(matches!(
            EIGHT_PUZZLE.goal_for(&mixed),
            Err(SolveError::UnknownPattern { .. })
        ));
    }

    #[test]
    fn test_partition_keeps_blank_and_group_tiles() {
        let board = Board::<3, 9>::from_tiles(&[1, 8, 2, 0, 4, 3, 7, 6, 5]).unwrap();
        let patterns = EIGHT_PUZZLE.partition(&board);
        let keys: Vec<String> = patterns.iter().map(Board::key).collect();
        assert_eq!(keys, vec!["1,a,2,0,4,3,a,a,a", "a,8,a,0,a,a,7,6,5"]);
    }

    #[test]
    fn test_partition_groups_cover_every_tile_once() {
        let board = FIFTEEN_PUZZLE.goal();
        let patterns = FIFTEEN_PUZZLE.partition(&board);
        for idx in 0..15 {
            let owners = patterns
                .iter()
                .filter(|pattern| pattern.cells()[idx].is_tile())
                .count();
            assert_eq!(owners, 1, "Cell {idx} owned by {owners} patterns");
        }
    }
}
