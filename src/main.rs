//! Sliding-Tile Puzzle Solver
//!
//! Solves 3x3 and 4x4 sliding-tile boards with A* and builds the disjoint
//! pattern database its strongest heuristic reads from. The database lives in
//! a JSON table file; batch builds keep their own resumable directory.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use slider::builder::{self, BatchConfig, DEFAULT_BATCH_SIZE};
use slider::error::ParseError;
use slider::heuristic::{CostModel, HeuristicMode, PatternReference, SearchConfig};
use slider::search::SearchOutcome;
use slider::store::{self as cost_store, CostStore, MemoryStore};
use slider::{persistence, puzzle_for_key, puzzle_for_side, PuzzleOps};

/// Solves sliding-tile puzzles and builds their pattern databases.
#[derive(Parser)]
#[command(name = "slider")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve one board given as a comma-separated key.
    Solve {
        state: String,
        #[command(flatten)]
        search: SearchArgs,
        /// Table file for the pattern-database heuristic.
        #[arg(long)]
        table: Option<PathBuf>,
    },
    /// Print the stored pattern costs of a board.
    Lookup {
        state: String,
        #[arg(long)]
        table: PathBuf,
    },
    /// Insert an empty record for every solvable board.
    Seed {
        #[arg(long, default_value_t = 3)]
        side: usize,
        /// Stop after this many boards.
        #[arg(long)]
        limit: Option<usize>,
        /// Seed a table file.
        #[arg(long, conflicts_with = "backlog", required_unless_present = "backlog")]
        table: Option<PathBuf>,
        /// Seed a batch build directory instead.
        #[arg(long)]
        backlog: Option<PathBuf>,
    },
    /// Resumable batch build over a seeded build directory.
    Build {
        #[arg(long, default_value_t = 3)]
        side: usize,
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Stop after this many batches.
        #[arg(long)]
        max_batches: Option<usize>,
        /// Export completed records to this table file once the build finishes.
        #[arg(long)]
        table: Option<PathBuf>,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Fill every pending record of a table on a worker pool.
    Populate {
        #[arg(long, default_value_t = 3)]
        side: usize,
        #[arg(long)]
        table: PathBuf,
        /// Defaults to the available hardware concurrency.
        #[arg(long)]
        workers: Option<usize>,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Show build progress of a table.
    Count {
        #[arg(long)]
        table: PathBuf,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Estimator for boards without wildcards.
    #[arg(long, value_enum, default_value_t = HeuristicArg::Manhattan)]
    heuristic: HeuristicArg,
    /// Reference positions of the pattern estimate.
    #[arg(long, value_enum, default_value_t = ReferenceArg::Canonical)]
    reference: ReferenceArg,
    #[arg(long, value_enum, default_value_t = CostModelArg::Additive)]
    cost_model: CostModelArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum HeuristicArg {
    Manhattan,
    PatternDatabase,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReferenceArg {
    Canonical,
    Goal,
}

#[derive(Clone, Copy, ValueEnum)]
enum CostModelArg {
    Additive,
    EveryMove,
}

impl From<&SearchArgs> for SearchConfig {
    fn from(args: &SearchArgs) -> Self {
        SearchConfig {
            heuristic: match args.heuristic {
                HeuristicArg::Manhattan => HeuristicMode::Manhattan,
                HeuristicArg::PatternDatabase => HeuristicMode::PatternDatabase,
            },
            reference: match args.reference {
                ReferenceArg::Canonical => PatternReference::Canonical,
                ReferenceArg::Goal => PatternReference::Goal,
            },
            cost_model: match args.cost_model {
                CostModelArg::Additive => CostModel::Additive,
                CostModelArg::EveryMove => CostModel::EveryMove,
            },
        }
    }
}

type CliResult = Result<(), Box<dyn Error>>;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Solve {
            state,
            search,
            table,
        } => run_solve(&state, (&search).into(), table.as_deref()),
        Command::Lookup { state, table } => run_lookup(&state, &table),
        Command::Seed {
            side,
            limit,
            table,
            backlog,
        } => run_seed(side, limit, table.as_deref(), backlog.as_deref()),
        Command::Build {
            side,
            dir,
            batch_size,
            max_batches,
            table,
            search,
        } => run_build(
            side,
            BatchConfig {
                dir,
                batch_size,
                max_batches,
                search: (&search).into(),
            },
            table.as_deref(),
        ),
        Command::Populate {
            side,
            table,
            workers,
            search,
        } => run_populate(side, &table, workers, (&search).into()),
        Command::Count { table } => run_count(&table),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn select_puzzle(side: usize) -> Result<&'static dyn PuzzleOps, ParseError> {
    puzzle_for_side(side).ok_or(ParseError::UnsupportedSize { cells: side * side })
}

fn open_table(path: &Path) -> Result<MemoryStore, Box<dyn Error>> {
    Ok(MemoryStore::from_records(persistence::load_table(path)?))
}

fn save_table(path: &Path, store: &MemoryStore) -> CliResult {
    persistence::save_table(path, &store.records()?)?;
    info!(records = store.len(), path = %path.display(), "saved table");
    Ok(())
}

/// Board, result and move listing of one solve request.
fn render_outcome(
    puzzle: &dyn PuzzleOps,
    state: &str,
    outcome: &SearchOutcome,
) -> Result<String, ParseError> {
    let mut output = format!("state {state}\n{}\n", puzzle.format_state(state)?);
    match outcome {
        SearchOutcome::Solved(solution) => {
            output.push_str(&format!(
                "solved in {} moves (cost {}, {} expanded)\n",
                solution.moves.len(),
                solution.cost,
                solution.explored
            ));
            let symbols: Vec<String> = solution
                .moves
                .iter()
                .map(|direction| direction.symbol().to_string())
                .collect();
            output.push_str(&symbols.join(" "));
            output.push('\n');
        }
        SearchOutcome::NotSolvable => output.push_str("not solvable\n"),
        SearchOutcome::NoSolution { explored } => {
            output.push_str(&format!("no solution after {explored} expansions\n"));
        }
    }
    Ok(output)
}

/// The disjoint patterns of a full board, one grid each.
fn render_patterns(puzzle: &dyn PuzzleOps, state: &str) -> Result<String, ParseError> {
    let mut output = String::from("patterns:\n");
    for pattern in puzzle.partition(state)? {
        output.push_str(&format!("{pattern}\n{}", puzzle.format_state(&pattern)?));
    }
    Ok(output)
}

fn run_solve(state: &str, config: SearchConfig, table: Option<&Path>) -> CliResult {
    let puzzle = puzzle_for_key(state)?;
    let store = table.map(open_table).transpose()?;
    let outcome = puzzle.solve(
        state,
        config,
        store.as_ref().map(|store| store as &dyn CostStore),
    )?;
    print!("{}", render_outcome(puzzle, state, &outcome)?);
    Ok(())
}

fn run_lookup(state: &str, table: &Path) -> CliResult {
    let puzzle = puzzle_for_key(state)?;
    let store = open_table(table)?;
    match store.get(state)? {
        Some(record) if record.is_complete() => {
            for (pattern, cost) in record.sub_states.iter().zip(&record.costs) {
                println!("{pattern}  cost {cost}");
            }
            if let Some(total) = record.cost_total {
                println!("total {total}");
            }
        }
        Some(_) => println!("{state} is seeded but not computed yet"),
        None => {
            println!("{state} is not in the table");
            print!("{}", render_patterns(puzzle, state)?);
        }
    }
    Ok(())
}

fn run_seed(
    side: usize,
    limit: Option<usize>,
    table: Option<&Path>,
    backlog: Option<&Path>,
) -> CliResult {
    let puzzle = select_puzzle(side)?;
    if let Some(dir) = backlog {
        let written = builder::seed_backlog(puzzle, dir, limit)?;
        println!("Wrote {written} pending records to {}", dir.display());
    }
    if let Some(path) = table {
        let store = open_table(path)?;
        let inserted = builder::seed_store(puzzle, &store, limit)?;
        save_table(path, &store)?;
        println!("Inserted {inserted} pending records");
    }
    Ok(())
}

fn run_build(side: usize, config: BatchConfig, table: Option<&Path>) -> CliResult {
    let puzzle = select_puzzle(side)?;
    let report = builder::run_batches(puzzle, &config)?;
    println!(
        "{} batches: {} computed, {} already complete, {} skipped as malformed",
        report.batches, report.processed, report.skipped, report.malformed
    );

    if !report.finished {
        println!(
            "Stopped at index {}; rerun to resume",
            report.checkpoint.current_index
        );
        return Ok(());
    }
    if let Some(path) = table {
        let store = open_table(path)?;
        for record in report.records.into_iter().filter(|r| r.is_complete()) {
            store.put(record)?;
        }
        save_table(path, &store)?;
    }
    Ok(())
}

fn run_populate(
    side: usize,
    table: &Path,
    workers: Option<usize>,
    config: SearchConfig,
) -> CliResult {
    let puzzle = select_puzzle(side)?;
    let store = open_table(table)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        warn!(error = %e, "could not install interrupt handler");
    }

    let workers = workers.unwrap_or_else(builder::available_workers);
    let report = builder::populate(puzzle, &store, config, workers, &cancel)?;
    // committed records are kept even when the run was interrupted
    save_table(table, &store)?;

    println!(
        "{} submitted, {} completed, {} already complete, {} failed",
        report.submitted, report.completed, report.skipped, report.failed
    );
    if report.cancelled {
        println!("Interrupted; rerun to continue with the remaining records");
    }
    Ok(())
}

fn run_count(table: &Path) -> CliResult {
    let store = open_table(table)?;
    let stats = cost_store::stats(&store)?;
    println!(
        "{} records: {} complete, {} pending",
        stats.total, stats.complete, stats.pending
    );
    Ok(())
}
