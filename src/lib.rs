//! Sliding-Tile Puzzle Solver Library
//!
//! A* search for 3x3 and 4x4 sliding-tile puzzles, plus construction of
//! additive disjoint pattern databases used as a search heuristic.

pub mod board;
pub mod builder;
pub mod error;
pub mod heuristic;
pub mod persistence;
pub mod puzzles;
pub mod search;
pub mod solvability;
pub mod store;

use board::{format_board, Board};
use builder::{enumerate_solvable, RecordBuilder, RecordSource};
use error::{ParseError, SolveError};
use heuristic::{SearchConfig, Session};
use puzzles::{Puzzle, EIGHT_PUZZLE, FIFTEEN_PUZZLE};
use search::SearchOutcome;
use store::CostStore;

/// Trait that erases compile-time board parameters for dynamic dispatch.
///
/// `SIDE` and `CELLS` are hidden behind the vtable, so callers pick a puzzle
/// at runtime from a side length or a state key.
pub trait PuzzleOps: Sync {
    fn side(&self) -> usize;
    fn cells(&self) -> usize;
    fn goal_key(&self) -> String;
    fn solve(
        &self,
        state: &str,
        config: SearchConfig,
        store: Option<&dyn CostStore>,
    ) -> Result<SearchOutcome, SolveError>;
    fn is_solvable(&self, state: &str) -> Result<bool, ParseError>;
    fn partition(&self, state: &str) -> Result<Vec<String>, ParseError>;
    fn format_state(&self, state: &str) -> Result<String, ParseError>;
    /// Keys of solvable full boards in enumeration order.
    fn solvable_states(&self, limit: Option<usize>) -> Box<dyn Iterator<Item = String> + '_>;
    fn record_source(&self, config: SearchConfig) -> Box<dyn RecordSource + '_>;
}

impl<const SIDE: usize, const CELLS: usize> PuzzleOps for Puzzle<SIDE, CELLS> {
    fn side(&self) -> usize {
        SIDE
    }

    fn cells(&self) -> usize {
        CELLS
    }

    fn goal_key(&self) -> String {
        self.goal().key()
    }

    fn solve(
        &self,
        state: &str,
        config: SearchConfig,
        store: Option<&dyn CostStore>,
    ) -> Result<SearchOutcome, SolveError> {
        let start = Board::<SIDE, CELLS>::parse(state)?;
        let mut session = Session::new(config);
        if let Some(store) = store {
            session = session.with_store(store);
        }
        search::solve(self, &start, &mut session)
    }

    fn is_solvable(&self, state: &str) -> Result<bool, ParseError> {
        let board = Board::<SIDE, CELLS>::parse(state)?;
        Ok(solvability::is_solvable(&board))
    }

    fn partition(&self, state: &str) -> Result<Vec<String>, ParseError> {
        let board = Board::<SIDE, CELLS>::parse(state)?;
        Ok(Puzzle::partition(self, &board)
            .iter()
            .map(Board::key)
            .collect())
    }

    fn format_state(&self, state: &str) -> Result<String, ParseError> {
        Ok(format_board(&Board::<SIDE, CELLS>::parse(state)?))
    }

    fn solvable_states(&self, limit: Option<usize>) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(
            enumerate_solvable(self)
                .take(limit.unwrap_or(usize::MAX))
                .map(|board| board.key()),
        )
    }

    fn record_source(&self, config: SearchConfig) -> Box<dyn RecordSource + '_> {
        Box::new(RecordBuilder::new(self, config))
    }
}

/// The puzzle for a given side length.
pub fn puzzle_for_side(side: usize) -> Option<&'static dyn PuzzleOps> {
    match side {
        3 => Some(&EIGHT_PUZZLE),
        4 => Some(&FIFTEEN_PUZZLE),
        _ => None,
    }
}

/// The puzzle whose cell count matches a state key.
pub fn puzzle_for_key(key: &str) -> Result<&'static dyn PuzzleOps, ParseError> {
    let cells = key.split(',').count();
    match cells {
        9 => Ok(&EIGHT_PUZZLE),
        16 => Ok(&FIFTEEN_PUZZLE),
        _ => Err(ParseError::UnsupportedSize { cells }),
    }
}
