//! Disjoint pattern database construction.
//!
//! Pipeline: enumerate permutations of the complete goal, keep the solvable
//! ones, split each into patterns, solve every pattern with A* and store
//! the per-pattern costs with their sum.
//!
//! Two execution modes:
//! - [`run_batches`]: sequential, resumable through a checkpoint after every
//!   fixed-size slice of the backlog
//! - [`populate`]: a bounded rayon pool over the store's pending records,
//!   one independent task per record, cooperatively cancellable

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use itertools::Itertools;
use tracing::{info, warn};

use crate::board::{Board, Cell};
use crate::error::BuildError;
use crate::heuristic::{SearchConfig, Session};
use crate::persistence::{self, BuildCheckpoint};
use crate::puzzles::Puzzle;
use crate::search::{search, SearchOutcome};
use crate::solvability::is_solvable;
use crate::store::{Connect, CostStore, DatabaseRecord};
use crate::PuzzleOps;

/// Default number of backlog entries per committed batch.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Pool submissions are made in rounds of this many tasks per worker.
const TASKS_PER_WORKER_ROUND: usize = 64;

/// Lazily enumerates every solvable arrangement of the complete goal.
///
/// Order follows the permutation order of the goal's cells.
pub fn enumerate_solvable<const SIDE: usize, const CELLS: usize>(
    puzzle: &Puzzle<SIDE, CELLS>,
) -> impl Iterator<Item = Board<SIDE, CELLS>> {
    let goal = puzzle.goal();
    goal.cells()
        .to_vec()
        .into_iter()
        .permutations(CELLS)
        .filter_map(|cells| {
            let cells: [Cell; CELLS] = cells.try_into().ok()?;
            Board::new(cells).ok()
        })
        .filter(|board| is_solvable(board))
}

/// Computes database records for one puzzle size.
pub trait RecordSource {
    fn compute(&mut self, state: &str) -> Result<DatabaseRecord, BuildError>;
}

/// Solves the patterns of full boards, reusing one session's cache.
pub struct RecordBuilder<'p, const SIDE: usize, const CELLS: usize> {
    puzzle: &'p Puzzle<SIDE, CELLS>,
    session: Session<'static, SIDE, CELLS>,
}

impl<'p, const SIDE: usize, const CELLS: usize> RecordBuilder<'p, SIDE, CELLS> {
    pub fn new(puzzle: &'p Puzzle<SIDE, CELLS>, config: SearchConfig) -> Self {
        Self {
            puzzle,
            session: Session::new(config),
        }
    }

    pub fn compute_board(&mut self, board: &Board<SIDE, CELLS>) -> Result<DatabaseRecord, BuildError> {
        if board.has_wildcards() || !is_solvable(board) {
            return Err(BuildError::NotSolvable { state: board.key() });
        }

        let mut sub_states = Vec::with_capacity(self.puzzle.groups.len());
        let mut costs = Vec::with_capacity(self.puzzle.groups.len());
        for pattern in self.puzzle.partition(board) {
            match search(self.puzzle, &pattern, &mut self.session)? {
                SearchOutcome::Solved(solution) => costs.push(solution.cost),
                _ => {
                    return Err(BuildError::Unreachable {
                        pattern: pattern.key(),
                    })
                }
            }
            sub_states.push(pattern.key());
        }

        Ok(DatabaseRecord {
            state: board.key(),
            visited: true,
            sub_states,
            cost_total: Some(costs.iter().sum()),
            costs,
        })
    }
}

impl<const SIDE: usize, const CELLS: usize> RecordSource for RecordBuilder<'_, SIDE, CELLS> {
    fn compute(&mut self, state: &str) -> Result<DatabaseRecord, BuildError> {
        let board = Board::<SIDE, CELLS>::parse(state)?;
        self.compute_board(&board)
    }
}

/// Whether a failed record should be reported and skipped rather than abort the run.
fn is_bad_record(error: &BuildError) -> bool {
    matches!(error, BuildError::Parse(_) | BuildError::NotSolvable { .. })
}

/// Inserts an empty record for each solvable state. Returns how many were new.
pub fn seed_store(
    puzzle: &dyn PuzzleOps,
    store: &dyn CostStore,
    limit: Option<usize>,
) -> Result<usize, BuildError> {
    let mut inserted = 0;
    for state in puzzle.solvable_states(limit) {
        if store.insert_pending(&state)? {
            inserted += 1;
        }
    }
    info!(inserted, "seeded store");
    Ok(inserted)
}

/// Writes the initial backlog of solvable states for batch mode.
pub fn seed_backlog(
    puzzle: &dyn PuzzleOps,
    dir: &std::path::Path,
    limit: Option<usize>,
) -> Result<usize, BuildError> {
    let records: Vec<DatabaseRecord> = puzzle
        .solvable_states(limit)
        .map(DatabaseRecord::pending)
        .collect();
    persistence::save_backlog(dir, &records)?;
    info!(records = records.len(), dir = %dir.display(), "wrote backlog");
    Ok(records.len())
}

/// Settings for the resumable batch mode.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub dir: PathBuf,
    pub batch_size: usize,
    /// Stop after this many batches in this run.
    pub max_batches: Option<usize>,
    pub search: SearchConfig,
}

impl BatchConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_batches: None,
            search: SearchConfig::default(),
        }
    }
}

/// What one batch-mode run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub batches: usize,
    /// Records whose costs were computed in this run.
    pub processed: usize,
    /// Records already complete when reached.
    pub skipped: usize,
    /// Records that could not be parsed or solved.
    pub malformed: usize,
    pub checkpoint: BuildCheckpoint,
    /// The cursor reached the end of the backlog.
    pub finished: bool,
    /// Records as of the last committed batch.
    pub records: Vec<DatabaseRecord>,
}

/// Processes the backlog slice by slice from the saved checkpoint.
///
/// After each slice the whole backlog is written as a numbered snapshot,
/// then the checkpoint advances past the slice.
pub fn run_batches(puzzle: &dyn PuzzleOps, config: &BatchConfig) -> Result<BatchReport, BuildError> {
    let batch_size = config.batch_size.max(1);
    let mut checkpoint = persistence::load_checkpoint(&config.dir)?;
    let mut records = persistence::load_progress(&config.dir, &checkpoint)?;
    let mut source = puzzle.record_source(config.search);
    let mut report = BatchReport::default();

    if checkpoint.current_index > 0 {
        info!(
            batch = checkpoint.last_completed_batch,
            index = checkpoint.current_index,
            "resuming build"
        );
    }

    while checkpoint.current_index < records.len() {
        if config.max_batches.is_some_and(|max| report.batches >= max) {
            break;
        }

        let started = Instant::now();
        let end = (checkpoint.current_index + batch_size).min(records.len());
        for record in &mut records[checkpoint.current_index..end] {
            if record.is_complete() {
                report.skipped += 1;
                continue;
            }
            match source.compute(&record.state) {
                Ok(computed) => {
                    *record = computed;
                    report.processed += 1;
                }
                Err(error) if is_bad_record(&error) => {
                    warn!(state = %record.state, %error, "skipping record");
                    report.malformed += 1;
                }
                Err(error) => return Err(error),
            }
        }

        persistence::save_snapshot(&config.dir, checkpoint.last_completed_batch, &records)?;
        checkpoint.last_completed_batch += 1;
        checkpoint.current_index = end;
        persistence::save_checkpoint(&config.dir, &checkpoint)?;
        report.batches += 1;

        info!(
            batch = checkpoint.last_completed_batch - 1,
            progress = format!("{}/{}", end, records.len()),
            elapsed = format!("{:.2}s", started.elapsed().as_secs_f64()),
            "committed batch"
        );
    }

    report.finished = checkpoint.current_index >= records.len();
    report.checkpoint = checkpoint;
    report.records = records;
    Ok(report)
}

/// What one pool run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub submitted: usize,
    pub completed: usize,
    /// Records another task or run had already finished.
    pub skipped: usize,
    pub failed: usize,
    /// Submission stopped because the cancel flag was set.
    pub cancelled: bool,
}

/// Worker count matching the available hardware concurrency.
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

enum TaskResult {
    Completed,
    Skipped,
}

/// One pool task: its own connection, its own session, one record write.
fn process_state<C: Connect>(
    puzzle: &dyn PuzzleOps,
    connector: &C,
    config: SearchConfig,
    state: &str,
) -> Result<TaskResult, BuildError> {
    let store = connector.connect()?;
    if store.get(state)?.is_some_and(|record| record.is_complete()) {
        return Ok(TaskResult::Skipped);
    }
    let record = puzzle.record_source(config).compute(state)?;
    store.put(record)?;
    Ok(TaskResult::Completed)
}

/// Computes every pending record of the store on a bounded worker pool.
///
/// `cancel` is checked before each submission. Tasks already submitted
/// always run to completion, and their writes stay committed.
pub fn populate<C: Connect>(
    puzzle: &dyn PuzzleOps,
    connector: &C,
    config: SearchConfig,
    workers: usize,
    cancel: &AtomicBool,
) -> Result<PoolReport, BuildError> {
    let workers = workers.max(1);
    let pending = connector.connect()?.pending()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("populate-{index}"))
        .build()?;

    info!(pending = pending.len(), workers, "starting worker pool");
    let started = Instant::now();
    let submitted = AtomicUsize::new(0);
    let completed = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let mut cancelled = false;

    for round in pending.chunks(workers * TASKS_PER_WORKER_ROUND) {
        pool.scope(|scope| {
            for state in round {
                if cancel.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
                submitted.fetch_add(1, Ordering::Relaxed);
                let (completed, skipped, failed) = (&completed, &skipped, &failed);
                scope.spawn(move |_| match process_state(puzzle, connector, config, state) {
                    Ok(TaskResult::Completed) => {
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(TaskResult::Skipped) => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(error) => {
                        warn!(%state, %error, "task failed");
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        if cancelled {
            warn!("cancelled; no further tasks submitted");
            break;
        }
        info!(
            completed = completed.load(Ordering::Relaxed),
            total = pending.len(),
            elapsed = format!("{:.2}s", started.elapsed().as_secs_f64()),
            "pool progress"
        );
    }

    Ok(PoolReport {
        submitted: submitted.into_inner(),
        completed: completed.into_inner(),
        skipped: skipped.into_inner(),
        failed: failed.into_inner(),
        cancelled,
    })
}
