//! Board representation and the blank-relative move model.
//!
//! Generic over side length (`SIDE`) and total cell count (`CELLS = SIDE^2`).
//! The board is a flat row-major array where each cell holds a real tile,
//! a wildcard placeholder or the single blank.

use std::fmt;

use crate::error::ParseError;

/// Token used for wildcard cells in textual keys.
pub const WILDCARD_TOKEN: &str = "a";

/// Token used for the blank in textual keys.
pub const BLANK_TOKEN: &str = "0";

/// Content of one board position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    /// A numbered tile, `1..CELLS`.
    Tile(u8),
    /// A tile outside the current pattern; all wildcards are interchangeable.
    Wildcard,
    /// The empty cell the moves are expressed relative to.
    Blank,
}

impl Cell {
    /// Parses one comma-separated token of a state key.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let token = token.trim();
        if token == BLANK_TOKEN {
            return Ok(Cell::Blank);
        }
        if token == WILDCARD_TOKEN {
            return Ok(Cell::Wildcard);
        }
        token
            .parse::<u8>()
            .map(Cell::Tile)
            .map_err(|_| ParseError::InvalidToken {
                token: token.to_string(),
            })
    }

    #[inline]
    pub const fn is_tile(self) -> bool {
        matches!(self, Cell::Tile(_))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Tile(id) => write!(f, "{id}"),
            Cell::Wildcard => f.write_str(WILDCARD_TOKEN),
            Cell::Blank => f.write_str(BLANK_TOKEN),
        }
    }
}

/// Converts a linear cell index to (row, col).
#[inline(always)]
pub const fn idx_to_coord<const SIDE: usize>(cell_index: usize) -> (usize, usize) {
    (cell_index / SIDE, cell_index % SIDE)
}

/// Converts (row, col) to a linear cell index.
#[inline(always)]
pub const fn coord_to_idx<const SIDE: usize>(row: usize, col: usize) -> usize {
    row * SIDE + col
}

/// Direction the blank travels in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Left,
    Right,
    Up,
    Down,
}

impl Move {
    /// Expansion order. Equal-evaluation children enter the frontier in this order.
    pub const ALL: [Move; 4] = [Move::Left, Move::Right, Move::Up, Move::Down];

    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Move::Left => 1,
            Move::Right => 2,
            Move::Up => 4,
            Move::Down => 8,
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Move::Left => Move::Right,
            Move::Right => Move::Left,
            Move::Up => Move::Down,
            Move::Down => Move::Up,
        }
    }

    /// Arrow glyph for compact move listings.
    pub const fn symbol(self) -> char {
        match self {
            Move::Left => '←',
            Move::Right => '→',
            Move::Up => '↑',
            Move::Down => '↓',
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Left => "Left",
            Move::Right => "Right",
            Move::Up => "Up",
            Move::Down => "Down",
        };
        f.write_str(name)
    }
}

/// The legal moves for one blank position, packed into a bitmask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveSet(u8);

impl MoveSet {
    /// Derives legality from the blank's linear index alone.
    pub const fn for_blank<const SIDE: usize>(blank: usize) -> Self {
        let mut bits = 0;
        if blank % SIDE != 0 {
            bits |= Move::Left.bit();
        }
        if blank % SIDE != SIDE - 1 {
            bits |= Move::Right.bit();
        }
        if blank >= SIDE {
            bits |= Move::Up.bit();
        }
        if blank + SIDE < SIDE * SIDE {
            bits |= Move::Down.bit();
        }
        Self(bits)
    }

    #[inline]
    pub const fn contains(self, direction: Move) -> bool {
        self.0 & direction.bit() != 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the contained moves in [`Move::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Move> {
        Move::ALL.into_iter().filter(move |&m| self.contains(m))
    }
}

/// The set of labels present on a board, ignoring positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelSet {
    /// Bit `id` set when tile `id` is on the board.
    pub tiles: u64,
    pub wildcard: bool,
}

/// Immutable board snapshot. Transitions return new boards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Board<const SIDE: usize, const CELLS: usize> {
    cells: [Cell; CELLS],
    blank: usize,
}

impl<const SIDE: usize, const CELLS: usize> Board<SIDE, CELLS> {
    /// Builds a board after checking the blank and tile invariants.
    pub fn new(cells: [Cell; CELLS]) -> Result<Self, ParseError> {
        let mut seen = [false; CELLS];
        let mut blank = None;
        let mut blanks = 0;

        for (idx, &cell) in cells.iter().enumerate() {
            match cell {
                Cell::Blank => {
                    blanks += 1;
                    blank = Some(idx);
                }
                Cell::Tile(id) => {
                    let tile = id as usize;
                    if tile == 0 || tile >= CELLS {
                        return Err(ParseError::TileOutOfRange { tile, cells: CELLS });
                    }
                    if seen[tile] {
                        return Err(ParseError::DuplicateTile { tile: id });
                    }
                    seen[tile] = true;
                }
                Cell::Wildcard => {}
            }
        }

        match (blanks, blank) {
            (1, Some(blank)) => Ok(Self { cells, blank }),
            _ => Err(ParseError::BlankCount { found: blanks }),
        }
    }

    /// Builds a board whose invariants the caller already guarantees.
    #[inline]
    pub(crate) const fn from_parts(cells: [Cell; CELLS], blank: usize) -> Self {
        Self { cells, blank }
    }

    /// Builds a board from numeric tiles with `0` as the blank.
    pub fn from_tiles(tiles: &[u8]) -> Result<Self, ParseError> {
        if tiles.len() != CELLS {
            return Err(ParseError::WrongLength {
                expected: CELLS,
                found: tiles.len(),
            });
        }
        let mut cells = [Cell::Blank; CELLS];
        for (cell, &tile) in cells.iter_mut().zip(tiles) {
            *cell = if tile == 0 { Cell::Blank } else { Cell::Tile(tile) };
        }
        Self::new(cells)
    }

    /// Parses a comma-joined state key such as `1,2,3,4,a,a,a,a,0`.
    pub fn parse(key: &str) -> Result<Self, ParseError> {
        let tokens: Vec<&str> = key.split(',').collect();
        if tokens.len() != CELLS {
            return Err(ParseError::WrongLength {
                expected: CELLS,
                found: tokens.len(),
            });
        }
        let mut cells = [Cell::Blank; CELLS];
        for (cell, token) in cells.iter_mut().zip(tokens) {
            *cell = Cell::parse(token)?;
        }
        Self::new(cells)
    }

    /// Canonical textual form, used as store and cache key.
    pub fn key(&self) -> String {
        self.cells
            .iter()
            .map(Cell::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    #[inline]
    pub fn cells(&self) -> &[Cell; CELLS] {
        &self.cells
    }

    #[inline]
    pub fn blank(&self) -> usize {
        self.blank
    }

    pub fn has_wildcards(&self) -> bool {
        self.cells.contains(&Cell::Wildcard)
    }

    #[inline]
    pub fn legal_moves(&self) -> MoveSet {
        MoveSet::for_blank::<SIDE>(self.blank)
    }

    /// Index of the cell the blank would swap with, if the move is legal.
    pub fn neighbor(&self, direction: Move) -> Option<usize> {
        if !self.legal_moves().contains(direction) {
            return None;
        }
        Some(match direction {
            Move::Left => self.blank - 1,
            Move::Right => self.blank + 1,
            Move::Up => self.blank - SIDE,
            Move::Down => self.blank + SIDE,
        })
    }

    /// Returns the board reached by swapping the blank with `target`.
    #[inline]
    pub(crate) fn swap_blank(&self, target: usize) -> Self {
        let mut cells = self.cells;
        cells.swap(self.blank, target);
        Self {
            cells,
            blank: target,
        }
    }

    /// Applies one move, or `None` when it would leave the board.
    pub fn apply(&self, direction: Move) -> Option<Self> {
        self.neighbor(direction).map(|target| self.swap_blank(target))
    }

    /// Applies a whole move sequence, failing on the first illegal move.
    pub fn replay(&self, moves: &[Move]) -> Option<Self> {
        moves
            .iter()
            .try_fold(*self, |board, &direction| board.apply(direction))
    }

    /// Position of each tile id, indexed by id.
    pub fn tile_positions(&self) -> [Option<usize>; CELLS] {
        let mut positions = [None; CELLS];
        for (idx, cell) in self.cells.iter().enumerate() {
            if let Cell::Tile(id) = cell {
                positions[*id as usize] = Some(idx);
            }
        }
        positions
    }

    pub fn labels(&self) -> LabelSet {
        let mut labels = LabelSet {
            tiles: 0,
            wildcard: false,
        };
        for cell in &self.cells {
            match cell {
                Cell::Tile(id) => labels.tiles |= 1 << id,
                Cell::Wildcard => labels.wildcard = true,
                Cell::Blank => {}
            }
        }
        labels
    }
}

impl<const SIDE: usize, const CELLS: usize> fmt::Display for Board<SIDE, CELLS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Formats a board as a grid, one row per line.
///
/// The blank shows as '.', wildcards as '*'.
pub fn format_board<const SIDE: usize, const CELLS: usize>(board: &Board<SIDE, CELLS>) -> String {
    let mut output = String::new();
    for row in board.cells.chunks(SIDE) {
        let line: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Cell::Tile(id) => format!("{id:>2}"),
                Cell::Wildcard => " *".to_string(),
                Cell::Blank => " .".to_string(),
            })
            .collect();
        output.push_str(&line.join(" "));
        output.push('\n');
    }
    output
}
