//! A* search over the sliding-tile move graph.
//!
//! - Nodes live in an arena; children point at their parent by index only
//! - Frontier entries are ordered by `(evaluation, insertion sequence)` so
//!   equal evaluations pop first-in first-out
//! - The explored set is an `FxHashSet` of boards, checked when children are
//!   generated. A board can be queued twice before its first pop; the second
//!   pop repeats some work and never changes the result
//! - Heuristic values are memoized in the caller's [`Session`]

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::board::{Board, Move, MoveSet};
use crate::error::SolveError;
use crate::heuristic::{Heuristic, Session};
use crate::puzzles::Puzzle;
use crate::solvability::is_solvable;

/// An optimal path to the goal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    /// Blank moves from the start board to the goal.
    pub moves: Vec<Move>,
    /// Path cost of the goal node under the session's cost model.
    pub cost: u32,
    /// Number of frontier pops, repeats included.
    pub explored: usize,
}

/// Result of a solve request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    Solved(Solution),
    /// Rejected by the solvability check; no search was run.
    NotSolvable,
    /// The frontier emptied without reaching the goal.
    NoSolution { explored: usize },
}

impl SearchOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SearchOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }
}

/// A board reached during one search run.
struct SearchNode<const SIDE: usize, const CELLS: usize> {
    board: Board<SIDE, CELLS>,
    /// Arena index of the node this one was expanded from.
    parent: Option<usize>,
    /// Move that produced this node; `None` for the root.
    last_move: Option<Move>,
    depth: u32,
    /// Path cost g.
    cost: u32,
    evaluation: u32,
    /// Legal moves, fixed by the blank position at construction.
    moves: MoveSet,
}

impl<const SIDE: usize, const CELLS: usize> SearchNode<SIDE, CELLS> {
    fn new(
        board: Board<SIDE, CELLS>,
        parent: Option<usize>,
        last_move: Option<Move>,
        depth: u32,
        cost: u32,
        evaluation: u32,
    ) -> Self {
        Self {
            board,
            parent,
            last_move,
            depth,
            cost,
            evaluation,
            moves: board.legal_moves(),
        }
    }
}

/// Frontier key: lowest evaluation first, then lowest insertion sequence.
type FrontierEntry = Reverse<(u32, u64, usize)>;

/// Walks parent links from `goal_index` to the root and returns the moves in order.
fn reconstruct<const SIDE: usize, const CELLS: usize>(
    arena: &[SearchNode<SIDE, CELLS>],
    goal_index: usize,
) -> Vec<Move> {
    let mut moves = Vec::with_capacity(arena[goal_index].depth as usize);
    let mut cursor = Some(goal_index);
    while let Some(index) = cursor {
        let node = &arena[index];
        if let Some(direction) = node.last_move {
            moves.push(direction);
        }
        cursor = node.parent;
    }
    moves.reverse();
    moves
}

/// Runs A* from `start` to the goal matching its label set.
///
/// Performs no solvability check; see [`solve`].
pub fn search<const SIDE: usize, const CELLS: usize>(
    puzzle: &Puzzle<SIDE, CELLS>,
    start: &Board<SIDE, CELLS>,
    session: &mut Session<'_, SIDE, CELLS>,
) -> Result<SearchOutcome, SolveError> {
    let goal = puzzle.goal_for(start)?;
    let heuristic = Heuristic::select(session.config(), start);
    let cost_model = session.config().cost_model;

    let root_evaluation = session.evaluate(heuristic, start, &goal, 0)?;
    let mut arena = vec![SearchNode::new(*start, None, None, 0, 0, root_evaluation)];
    let mut frontier: BinaryHeap<FrontierEntry> = BinaryHeap::new();
    let mut explored: FxHashSet<Board<SIDE, CELLS>> = FxHashSet::default();
    let mut sequence: u64 = 0;
    let mut pops = 0;

    frontier.push(Reverse((root_evaluation, sequence, 0)));
    explored.insert(*start);

    while let Some(Reverse((_, _, index))) = frontier.pop() {
        pops += 1;
        let board = arena[index].board;
        explored.insert(board);

        if board == goal {
            let moves = reconstruct(&arena, index);
            debug!(
                start = %start,
                cost = arena[index].cost,
                length = moves.len(),
                explored = pops,
                "search reached goal"
            );
            return Ok(SearchOutcome::Solved(Solution {
                moves,
                cost: arena[index].cost,
                explored: pops,
            }));
        }

        let (depth, cost, moves) = {
            let node = &arena[index];
            (node.depth, node.cost, node.moves)
        };
        for direction in moves.iter() {
            let Some(target) = board.neighbor(direction) else {
                continue;
            };
            let child = board.swap_blank(target);
            if explored.contains(&child) {
                continue;
            }

            let child_cost = cost + cost_model.step(board.cells()[target]);
            let evaluation = session.evaluate(heuristic, &child, &goal, child_cost)?;
            sequence += 1;
            arena.push(SearchNode::new(
                child,
                Some(index),
                Some(direction),
                depth + 1,
                child_cost,
                evaluation,
            ));
            frontier.push(Reverse((evaluation, sequence, arena.len() - 1)));
        }
    }

    debug!(start = %start, explored = pops, "frontier exhausted");
    Ok(SearchOutcome::NoSolution { explored: pops })
}

/// Solve entry point: checks solvability of full boards, then searches.
///
/// Pattern boards skip the check; inversion parity is undefined with wildcards.
pub fn solve<const SIDE: usize, const CELLS: usize>(
    puzzle: &Puzzle<SIDE, CELLS>,
    start: &Board<SIDE, CELLS>,
    session: &mut Session<'_, SIDE, CELLS>,
) -> Result<SearchOutcome, SolveError> {
    if !start.has_wildcards() && !is_solvable(start) {
        return Ok(SearchOutcome::NotSolvable);
    }
    search(puzzle, start, session)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rustc_hash::FxHashMap;

    use super::*;
    use crate::heuristic::{manhattan, CostModel, HeuristicMode, SearchConfig};
    use crate::puzzles::{EIGHT_PUZZLE, FIFTEEN_PUZZLE};
    use crate::store::{DatabaseRecord, MemoryStore};

    type Board3 = Board<3, 9>;

    /// Optimal distance of every reachable 3x3 board, by breadth-first search from the goal.
    fn bfs_distances() -> (FxHashMap<Board3, u32>, Vec<Board3>) {
        let goal = EIGHT_PUZZLE.goal();
        let mut distances = FxHashMap::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([goal]);
        distances.insert(goal, 0);

        while let Some(board) = queue.pop_front() {
            order.push(board);
            let next = distances[&board] + 1;
            for direction in board.legal_moves().iter() {
                let child = board.apply(direction).unwrap();
                if !distances.contains_key(&child) {
                    distances.insert(child, next);
                    queue.push_back(child);
                }
            }
        }
        (distances, order)
    }

    fn solve_with(config: SearchConfig, board: &Board3) -> Solution {
        let mut session = Session::new(config);
        solve(&EIGHT_PUZZLE, board, &mut session)
            .unwrap()
            .solution()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_goal_is_solved_without_moves() {
        let solution = solve_with(SearchConfig::default(), &EIGHT_PUZZLE.goal());
        assert!(solution.moves.is_empty());
        assert_eq!(solution.cost, 0);
        assert_eq!(solution.explored, 1);
    }

    #[test]
    fn test_example_board_replays_to_goal() {
        let start = Board3::from_tiles(&[1, 8, 2, 0, 4, 3, 7, 6, 5]).unwrap();
        let solution = solve_with(SearchConfig::default(), &start);

        assert_eq!(start.replay(&solution.moves), Some(EIGHT_PUZZLE.goal()));
        assert_eq!(solution.cost as usize, solution.moves.len());
        assert_eq!(solution.moves.len(), 9);
    }

    #[test]
    fn test_unsolvable_board_is_not_searched() {
        let start = Board3::from_tiles(&[2, 1, 3, 4, 5, 6, 7, 8, 0]).unwrap();
        let mut session = Session::new(SearchConfig::default());
        let outcome = solve(&EIGHT_PUZZLE, &start, &mut session).unwrap();
        assert_eq!(outcome, SearchOutcome::NotSolvable);
        assert!(session.cache().is_empty());
    }

    #[test]
    fn test_search_without_solvability_check_exhausts_frontier() {
        let start = Board3::from_tiles(&[2, 1, 3, 4, 5, 6, 7, 8, 0]).unwrap();
        let mut session = Session::new(SearchConfig::default());
        let outcome = search(&EIGHT_PUZZLE, &start, &mut session).unwrap();
        assert!(matches!(outcome, SearchOutcome::NoSolution { explored } if explored >= 181_440));
    }

    #[test]
    fn test_search_is_deterministic() {
        let start = Board3::from_tiles(&[0, 8, 7, 6, 5, 4, 3, 2, 1]).unwrap();
        let first = solve_with(SearchConfig::default(), &start);
        let second = solve_with(SearchConfig::default(), &start);
        assert_eq!(first, second);
    }

    #[test]
    fn test_astar_matches_breadth_first_optimum() {
        let (distances, order) = bfs_distances();
        assert_eq!(distances.len(), 181_440);

        for board in order.iter().step_by(4_999) {
            let solution = solve_with(SearchConfig::default(), board);
            assert_eq!(
                solution.moves.len() as u32,
                distances[board],
                "Suboptimal path for {board}"
            );
            assert_eq!(board.replay(&solution.moves), Some(EIGHT_PUZZLE.goal()));
        }
    }

    #[test]
    fn test_manhattan_never_overestimates() {
        let (distances, _) = bfs_distances();
        let goal = EIGHT_PUZZLE.goal();
        for (board, &distance) in &distances {
            assert!(
                manhattan(board, &goal) <= distance,
                "Manhattan overestimates {board}"
            );
        }
    }

    #[test]
    fn test_pattern_costs_sum_to_lower_bound() {
        let (distances, order) = bfs_distances();
        let config = SearchConfig::default();

        for board in order.iter().step_by(2_999) {
            let mut session = Session::new(config);
            let total: u32 = EIGHT_PUZZLE
                .partition(board)
                .iter()
                .map(|pattern| {
                    solve(&EIGHT_PUZZLE, pattern, &mut session)
                        .unwrap()
                        .solution()
                        .map(|solution| solution.cost)
                        .unwrap()
                })
                .sum();
            assert!(
                total <= distances[board],
                "Pattern sum {total} exceeds optimum {} for {board}",
                distances[board]
            );
        }
    }

    #[test]
    fn test_every_move_model_counts_wildcard_moves() {
        let start = Board3::from_tiles(&[1, 2, 3, 4, 5, 6, 7, 0, 8]).unwrap();
        let pattern = EIGHT_PUZZLE.partition(&start)[0];

        let additive = solve_with(SearchConfig::default(), &pattern);
        assert_eq!(additive.cost, 0);

        let every_move = solve_with(
            SearchConfig {
                cost_model: CostModel::EveryMove,
                ..Default::default()
            },
            &pattern,
        );
        assert_eq!(every_move.cost, 1);
        assert_eq!(every_move.moves, vec![Move::Right]);
    }

    #[test]
    fn test_pattern_solution_reaches_group_goal() {
        let start = Board3::from_tiles(&[1, 8, 2, 0, 4, 3, 7, 6, 5]).unwrap();
        for (group, pattern) in EIGHT_PUZZLE.partition(&start).iter().enumerate() {
            let solution = solve_with(SearchConfig::default(), pattern);
            assert_eq!(
                pattern.replay(&solution.moves),
                Some(EIGHT_PUZZLE.group_goal(group))
            );
        }
    }

    #[test]
    fn test_heuristics_agree_on_reversed_board() {
        let (distances, _) = bfs_distances();
        let start = Board3::from_tiles(&[0, 8, 7, 6, 5, 4, 3, 2, 1]).unwrap();
        assert!(is_solvable(&start));

        // exact distances are an admissible, consistent table
        let store = MemoryStore::from_records(distances.iter().map(|(board, &distance)| {
            let mut record = DatabaseRecord::pending(board.key());
            record.visited = true;
            record.cost_total = Some(distance);
            record
        }));

        let manhattan_solution = solve_with(SearchConfig::default(), &start);
        let mut session = Session::new(SearchConfig {
            heuristic: HeuristicMode::PatternDatabase,
            ..Default::default()
        })
        .with_store(&store);
        let outcome = solve(&EIGHT_PUZZLE, &start, &mut session).unwrap();
        let lookup_solution = outcome.solution().unwrap();

        assert_eq!(manhattan_solution.cost, distances[&start]);
        assert_eq!(lookup_solution.cost, manhattan_solution.cost);
        assert!(lookup_solution.explored <= manhattan_solution.explored);
    }

    #[test]
    fn test_lookup_miss_aborts_search() {
        let start = Board3::from_tiles(&[1, 2, 3, 4, 5, 6, 7, 0, 8]).unwrap();
        let store = MemoryStore::new();
        let mut session = Session::new(SearchConfig {
            heuristic: HeuristicMode::PatternDatabase,
            ..Default::default()
        })
        .with_store(&store);
        let result = solve(&EIGHT_PUZZLE, &start, &mut session);
        assert!(matches!(result, Err(SolveError::LookupMiss { .. })));
    }

    #[test]
    fn test_near_goal_4x4() {
        let goal = FIFTEEN_PUZZLE.goal();
        let start = goal
            .replay(&[Move::Up, Move::Left, Move::Up, Move::Left, Move::Down])
            .unwrap();
        let mut session = Session::new(SearchConfig::default());
        let outcome = solve(&FIFTEEN_PUZZLE, &start, &mut session).unwrap();
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.moves.len(), 5);
        assert_eq!(start.replay(&solution.moves), Some(goal));
    }
}
