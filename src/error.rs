//! Error types for parsing, searching, storage and database building.

use thiserror::Error;

/// Errors produced while reading a textual state key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A token was neither a tile number nor the wildcard letter.
    #[error("invalid cell token {token:?}")]
    InvalidToken { token: String },

    /// The key does not have one cell per board position.
    #[error("expected {expected} cells, found {found}")]
    WrongLength { expected: usize, found: usize },

    /// The key has no blank or more than one.
    #[error("expected exactly one blank, found {found}")]
    BlankCount { found: usize },

    /// A tile id is outside `1..CELLS`.
    #[error("tile {tile} is out of range for {cells} cells")]
    TileOutOfRange { tile: usize, cells: usize },

    /// The same tile id appears twice.
    #[error("tile {tile} appears more than once")]
    DuplicateTile { tile: u8 },

    /// The cell count is not a supported square board.
    #[error("no puzzle is defined for {cells} cells")]
    UnsupportedSize { cells: usize },
}

/// Errors from the persisted cost store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A connection to the store could not be opened.
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store table is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that abort a single search or heuristic query.
#[derive(Error, Debug)]
pub enum SolveError {
    /// The board's label set matches no goal in the catalogue.
    #[error("pattern {state} does not match any goal state")]
    UnknownPattern { state: String },

    /// The pattern database has no cost for this state.
    #[error("no precomputed cost for state {state}")]
    LookupMiss { state: String },

    /// Pattern-database lookup was requested without a store.
    #[error("pattern-database heuristic needs a cost store")]
    MissingStore,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that abort a database build run.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("build I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("build file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A sub-pattern search exhausted its frontier.
    #[error("no solution found for pattern {pattern}")]
    Unreachable { pattern: String },

    /// The backlog contains a board that cannot reach its goal.
    #[error("state {state} is not solvable")]
    NotSolvable { state: String },

    #[error("worker pool could not start: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
