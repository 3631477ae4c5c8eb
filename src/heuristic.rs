//! Heuristic strategies and the per-session evaluation cache.
//!
//! Three strategies estimate the remaining cost of a board:
//! - [`Heuristic::Manhattan`]: per-tile row/column offsets against the goal board
//! - [`Heuristic::ModifiedManhattan`]: the pattern estimate, measured against
//!   a [`PatternReference`]
//! - [`Heuristic::PatternDatabase`]: the precomputed total from a [`CostStore`]
//!
//! The strategy for a run is chosen once from the caller's [`HeuristicMode`]
//! and whether the start board carries wildcards.

use rustc_hash::FxHashMap;

use crate::board::{idx_to_coord, Board, Cell};
use crate::error::SolveError;
use crate::store::CostStore;

/// Caller-selected estimator for boards without wildcards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeuristicMode {
    #[default]
    Manhattan,
    PatternDatabase,
}

/// Where the pattern estimate expects each tile to end up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatternReference {
    /// Tile `id` belongs at index `id - 1`, whatever the supplied goal says.
    #[default]
    Canonical,
    /// Tile positions come from the supplied goal board.
    Goal,
}

/// How a move is charged while solving a board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CostModel {
    /// Moving a real tile costs 1, moving a wildcard costs 0.
    #[default]
    Additive,
    /// Every blank move costs 1.
    EveryMove,
}

impl CostModel {
    /// Cost of swapping the blank with `moved`.
    #[inline]
    pub const fn step(self, moved: Cell) -> u32 {
        match (self, moved) {
            (CostModel::Additive, Cell::Wildcard) => 0,
            _ => 1,
        }
    }
}

/// Settings shared by every search in a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchConfig {
    pub heuristic: HeuristicMode,
    pub reference: PatternReference,
    pub cost_model: CostModel,
}

/// A resolved estimator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heuristic {
    Manhattan,
    ModifiedManhattan(PatternReference),
    PatternDatabase,
}

impl Heuristic {
    /// Pattern boards always use the pattern estimate; full boards follow `mode`.
    pub fn select<const SIDE: usize, const CELLS: usize>(
        config: &SearchConfig,
        board: &Board<SIDE, CELLS>,
    ) -> Self {
        if board.has_wildcards() {
            return Heuristic::ModifiedManhattan(config.reference);
        }
        match config.heuristic {
            HeuristicMode::Manhattan => Heuristic::Manhattan,
            HeuristicMode::PatternDatabase => Heuristic::PatternDatabase,
        }
    }

    /// Estimates the remaining cost from `board` to `goal`.
    pub fn estimate<const SIDE: usize, const CELLS: usize>(
        self,
        board: &Board<SIDE, CELLS>,
        goal: &Board<SIDE, CELLS>,
        store: Option<&dyn CostStore>,
    ) -> Result<u32, SolveError> {
        match self {
            Heuristic::Manhattan => Ok(manhattan(board, goal)),
            Heuristic::ModifiedManhattan(reference) => {
                Ok(modified_manhattan(board, goal, reference))
            }
            Heuristic::PatternDatabase => {
                let store = store.ok_or(SolveError::MissingStore)?;
                let state = board.key();
                store
                    .total_cost(&state)?
                    .ok_or(SolveError::LookupMiss { state })
            }
        }
    }
}

#[inline]
fn distance<const SIDE: usize>(from: usize, to: usize) -> u32 {
    let (from_row, from_col) = idx_to_coord::<SIDE>(from);
    let (to_row, to_col) = idx_to_coord::<SIDE>(to);
    (from_row.abs_diff(to_row) + from_col.abs_diff(to_col)) as u32
}

/// Sum of row and column offsets of tiles `1..CELLS` against the goal.
pub fn manhattan<const SIDE: usize, const CELLS: usize>(
    board: &Board<SIDE, CELLS>,
    goal: &Board<SIDE, CELLS>,
) -> u32 {
    let current = board.tile_positions();
    let target = goal.tile_positions();
    (1..CELLS)
        .filter_map(|id| Some(distance::<SIDE>(current[id]?, target[id]?)))
        .sum()
}

/// Offset of every real tile on the board from its reference cell.
///
/// With [`PatternReference::Canonical`] the goal board is not consulted.
pub fn modified_manhattan<const SIDE: usize, const CELLS: usize>(
    board: &Board<SIDE, CELLS>,
    goal: &Board<SIDE, CELLS>,
    reference: PatternReference,
) -> u32 {
    let target = goal.tile_positions();
    board
        .cells()
        .iter()
        .enumerate()
        .filter_map(|(idx, cell)| match cell {
            Cell::Tile(id) => {
                let home = match reference {
                    PatternReference::Canonical => Some(*id as usize - 1),
                    PatternReference::Goal => target[*id as usize],
                };
                home.map(|home| distance::<SIDE>(idx, home))
            }
            _ => None,
        })
        .sum()
}

/// Memoized heuristic values keyed by board.
///
/// Holds `h` only, so a hit stays valid whatever path cost reached the board.
pub struct EvaluationCache<const SIDE: usize, const CELLS: usize> {
    entries: FxHashMap<Board<SIDE, CELLS>, u32>,
    hits: usize,
    misses: usize,
}

impl<const SIDE: usize, const CELLS: usize> Default for EvaluationCache<SIDE, CELLS> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<const SIDE: usize, const CELLS: usize> EvaluationCache<SIDE, CELLS> {
    pub fn get(&mut self, board: &Board<SIDE, CELLS>) -> Option<u32> {
        let cached = self.entries.get(board).copied();
        if cached.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        cached
    }

    pub fn insert(&mut self, board: Board<SIDE, CELLS>, estimate: u32) {
        self.entries.insert(board, estimate);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// One search or build session: configuration, cache and optional store.
///
/// The cache is only valid for the session's configuration, so sessions are
/// never shared between differently configured runs.
pub struct Session<'s, const SIDE: usize, const CELLS: usize> {
    config: SearchConfig,
    cache: EvaluationCache<SIDE, CELLS>,
    store: Option<&'s dyn CostStore>,
}

impl<'s, const SIDE: usize, const CELLS: usize> Session<'s, SIDE, CELLS> {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            cache: EvaluationCache::default(),
            store: None,
        }
    }

    /// Attaches the store consulted by the pattern-database heuristic.
    pub fn with_store(mut self, store: &'s dyn CostStore) -> Self {
        self.store = Some(store);
        self
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn cache(&self) -> &EvaluationCache<SIDE, CELLS> {
        &self.cache
    }

    /// Heuristic estimate for `board`, served from the cache when present.
    pub fn estimate(
        &mut self,
        heuristic: Heuristic,
        board: &Board<SIDE, CELLS>,
        goal: &Board<SIDE, CELLS>,
    ) -> Result<u32, SolveError> {
        if let Some(cached) = self.cache.get(board) {
            return Ok(cached);
        }
        let estimate = heuristic.estimate(board, goal, self.store)?;
        self.cache.insert(*board, estimate);
        Ok(estimate)
    }

    /// Evaluation score `h + g`.
    #[inline]
    pub fn evaluate(
        &mut self,
        heuristic: Heuristic,
        board: &Board<SIDE, CELLS>,
        goal: &Board<SIDE, CELLS>,
        path_cost: u32,
    ) -> Result<u32, SolveError> {
        Ok(self.estimate(heuristic, board, goal)? + path_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzles::EIGHT_PUZZLE;
    use crate::store::{DatabaseRecord, MemoryStore};

    fn board(tiles: &[u8]) -> Board<3, 9> {
        Board::from_tiles(tiles).unwrap()
    }

    #[test]
    fn test_manhattan_of_goal_is_zero() {
        let goal = EIGHT_PUZZLE.goal();
        assert_eq!(manhattan(&goal, &goal), 0);
    }

    #[test]
    fn test_manhattan_uses_row_and_column_offsets() {
        let goal = EIGHT_PUZZLE.goal();
        // 1:0 8:2 2:1 4:1 3:1 7:0 6:2 5:2
        assert_eq!(manhattan(&board(&[1, 8, 2, 0, 4, 3, 7, 6, 5]), &goal), 9);
        // 8:2 7:4 6:2 5:0 4:2 3:4 2:2 1:4
        assert_eq!(manhattan(&board(&[0, 8, 7, 6, 5, 4, 3, 2, 1]), &goal), 20);
    }

    #[test]
    fn test_modified_manhattan_counts_only_pattern_tiles() {
        let pattern = Board::<3, 9>::parse("a,8,a,0,a,a,7,6,5").unwrap();
        let goal = EIGHT_PUZZLE.group_goal(1);
        // 8:2 7:0 6:2 5:2
        assert_eq!(modified_manhattan(&pattern, &goal, PatternReference::Canonical), 6);
        assert_eq!(modified_manhattan(&pattern, &goal, PatternReference::Goal), 6);
    }

    #[test]
    fn test_canonical_reference_ignores_goal_board() {
        let pattern = Board::<3, 9>::parse("1,2,3,4,a,a,a,a,0").unwrap();
        // a goal that disagrees with the canonical layout
        let shifted = Board::<3, 9>::parse("a,1,2,3,4,a,a,a,0").unwrap();
        assert_eq!(modified_manhattan(&pattern, &shifted, PatternReference::Canonical), 0);
        assert_eq!(modified_manhattan(&pattern, &shifted, PatternReference::Goal), 6);
    }

    #[test]
    fn test_select_prefers_pattern_estimate_for_wildcards() {
        let config = SearchConfig {
            heuristic: HeuristicMode::PatternDatabase,
            ..Default::default()
        };
        let pattern = EIGHT_PUZZLE.group_goal(0);
        assert_eq!(
            Heuristic::select(&config, &pattern),
            Heuristic::ModifiedManhattan(PatternReference::Canonical)
        );
        assert_eq!(
            Heuristic::select(&config, &EIGHT_PUZZLE.goal()),
            Heuristic::PatternDatabase
        );
    }

    #[test]
    fn test_pattern_database_lookup() {
        let goal = EIGHT_PUZZLE.goal();
        let start = board(&[1, 2, 3, 4, 5, 6, 7, 0, 8]);
        let mut record = DatabaseRecord::pending(start.key());
        record.visited = true;
        record.cost_total = Some(2);
        let store = MemoryStore::from_records([record]);

        let estimate = Heuristic::PatternDatabase.estimate(&start, &goal, Some(&store));
        assert_eq!(estimate.unwrap(), 2);
    }

    #[test]
    fn test_pattern_database_miss_is_fatal() {
        let goal = EIGHT_PUZZLE.goal();
        let store = MemoryStore::new();
        let result = Heuristic::PatternDatabase.estimate(&goal, &goal, Some(&store));
        assert!(matches!(result, Err(SolveError::LookupMiss { state }) if state == goal.key()));

        let result = Heuristic::PatternDatabase.estimate(&goal, &goal, None);
        assert!(matches!(result, Err(SolveError::MissingStore)));
    }

    #[test]
    fn test_cache_returns_identical_score_for_repeated_queries() {
        let goal = EIGHT_PUZZLE.goal();
        let start = board(&[1, 8, 2, 0, 4, 3, 7, 6, 5]);
        let mut session = Session::<3, 9>::new(SearchConfig::default());

        let first = session.evaluate(Heuristic::Manhattan, &start, &goal, 3).unwrap();
        let second = session.evaluate(Heuristic::Manhattan, &start, &goal, 3).unwrap();
        assert_eq!(first, 12);
        assert_eq!(first, second);
        assert_eq!(session.cache().len(), 1);
        assert_eq!(session.cache().hits(), 1);
        assert_eq!(session.cache().misses(), 1);
    }

    #[test]
    fn test_cache_hit_adds_current_path_cost() {
        let goal = EIGHT_PUZZLE.goal();
        let start = board(&[1, 8, 2, 0, 4, 3, 7, 6, 5]);
        let mut session = Session::<3, 9>::new(SearchConfig::default());

        session.evaluate(Heuristic::Manhattan, &start, &goal, 0).unwrap();
        assert_eq!(session.evaluate(Heuristic::Manhattan, &start, &goal, 5).unwrap(), 14);
    }

    #[test]
    fn test_step_costs() {
        assert_eq!(CostModel::Additive.step(Cell::Wildcard), 0);
        assert_eq!(CostModel::Additive.step(Cell::Tile(3)), 1);
        assert_eq!(CostModel::EveryMove.step(Cell::Wildcard), 1);
    }
}
