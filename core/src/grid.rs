use thiserror::Error;

use crate::{Cell, CellCoord, Content, Direction, Kind, Piece, PowerUp};

const EMPTY_TOKEN: &str = ".";
const STONE_TOKEN: &str = "#";

/// Dense storage for every cell on the board.
///
/// The grid holds no game rules. It only stores cells, answers bounds
/// questions, and exchanges contents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates an empty grid with the provided dimensions.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        let len = columns as usize * rows as usize;
        Self {
            columns,
            rows,
            cells: vec![Cell::default(); len],
        }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the coordinate lies within the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        Some(cell.column() as usize * self.rows as usize + cell.row() as usize)
    }

    fn out_of_bounds(&self, cell: CellCoord) -> GridError {
        GridError::OutOfBounds {
            cell,
            columns: self.columns,
            rows: self.rows,
        }
    }

    /// Cell stored at the coordinate.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<&Cell> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    /// Mutable access to the cell stored at the coordinate.
    pub fn get_mut(&mut self, cell: CellCoord) -> Option<&mut Cell> {
        let index = self.index(cell)?;
        self.cells.get_mut(index)
    }

    /// Piece occupying the coordinate, if any.
    #[must_use]
    pub fn piece(&self, cell: CellCoord) -> Option<&Piece> {
        self.get(cell).and_then(Cell::piece)
    }

    /// Mutable access to the piece occupying the coordinate.
    pub fn piece_mut(&mut self, cell: CellCoord) -> Option<&mut Piece> {
        self.get_mut(cell).and_then(Cell::piece_mut)
    }

    /// Overwrites the cell stored at the coordinate.
    pub fn set(&mut self, cell: CellCoord, value: Cell) -> Result<(), GridError> {
        let error = self.out_of_bounds(cell);
        let slot = self.get_mut(cell).ok_or(error)?;
        *slot = value;
        Ok(())
    }

    /// Exchanges the contents of two cells. Obstacle overlays stay in place.
    pub fn swap(&mut self, first: CellCoord, second: CellCoord) -> Result<(), GridError> {
        let first_index = self.index(first).ok_or_else(|| self.out_of_bounds(first))?;
        let second_index = self
            .index(second)
            .ok_or_else(|| self.out_of_bounds(second))?;
        if first_index == second_index {
            return Ok(());
        }

        let first_content = self.cells[first_index].take_content();
        let second_content = self.cells[second_index].take_content();
        self.cells[first_index].set_content(second_content);
        self.cells[second_index].set_content(first_content);
        Ok(())
    }

    /// Coordinate one step away from `cell`, if it lies on the grid.
    #[must_use]
    pub fn step(&self, cell: CellCoord, direction: Direction) -> Option<CellCoord> {
        let (column_delta, row_delta) = direction.delta();
        self.offset(cell, column_delta, row_delta)
    }

    /// Coordinate displaced from `cell` by the provided deltas, if in bounds.
    #[must_use]
    pub fn offset(&self, cell: CellCoord, column_delta: i64, row_delta: i64) -> Option<CellCoord> {
        let column = i64::from(cell.column()) + column_delta;
        let row = i64::from(cell.row()) + row_delta;
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        let target = CellCoord::new(column, row);
        self.contains(target).then_some(target)
    }

    /// Bounds-checked neighbours in the four cardinal directions.
    pub fn neighbors(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.step(cell, direction))
    }

    /// Every coordinate in scan order: column by column, bottom to top.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> {
        let rows = self.rows;
        (0..self.columns).flat_map(move |column| (0..rows).map(move |row| CellCoord::new(column, row)))
    }

    /// Coordinates of one column from the bottom row upward.
    pub fn column_coords(&self, column: u32) -> impl Iterator<Item = CellCoord> {
        let rows = if column < self.columns { self.rows } else { 0 };
        (0..rows).map(move |row| CellCoord::new(column, row))
    }

    /// Coordinates of one row from the leftmost column rightward.
    pub fn row_coords(&self, row: u32) -> impl Iterator<Item = CellCoord> {
        let columns = if row < self.rows { self.columns } else { 0 };
        (0..columns).map(move |column| CellCoord::new(column, row))
    }

    /// Reports whether every column is compacted: no empty cell sits below
    /// an occupied one.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        (0..self.columns).all(|column| {
            let mut seen_gap = false;
            self.column_coords(column).all(|cell| {
                let empty = self.get(cell).map_or(true, Cell::is_empty);
                if empty {
                    seen_gap = true;
                    true
                } else {
                    !seen_gap
                }
            })
        })
    }

    /// Reports whether no cell on the grid is empty.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    /// Parses a textual layout.
    ///
    /// Rows are listed top row first. Every row holds one whitespace
    /// separated token per column: `.` for an empty cell, `#` for a stone,
    /// or a kind letter optionally followed by a power-up suffix.
    pub fn from_layout<S: AsRef<str>>(rows: &[S]) -> Result<Self, LayoutError> {
        let parsed: Vec<Vec<&str>> = rows
            .iter()
            .map(|row| row.as_ref().split_whitespace().collect())
            .collect();
        let columns = parsed.first().map_or(0, Vec::len);
        if parsed.is_empty() || columns == 0 {
            return Err(LayoutError::Empty);
        }

        let row_count = parsed.len() as u32;
        let mut grid = Self::new(columns as u32, row_count);
        for (line, tokens) in parsed.iter().enumerate() {
            if tokens.len() != columns {
                return Err(LayoutError::Ragged {
                    line,
                    expected: columns,
                    found: tokens.len(),
                });
            }
            let row = row_count - 1 - line as u32;
            for (column, token) in tokens.iter().enumerate() {
                let cell = CellCoord::new(column as u32, row);
                let content = parse_token(token).ok_or_else(|| LayoutError::UnknownToken {
                    token: (*token).to_owned(),
                    cell,
                })?;
                if let Some(slot) = grid.get_mut(cell) {
                    slot.set_content(content);
                }
            }
        }
        Ok(grid)
    }

    /// Renders the grid in the layout format accepted by [`Grid::from_layout`].
    #[must_use]
    pub fn to_layout(&self) -> Vec<String> {
        (0..self.rows)
            .rev()
            .map(|row| {
                self.row_coords(row)
                    .map(|cell| self.get(cell).map_or_else(String::new, |slot| token(slot.content())))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

fn parse_token(token: &str) -> Option<Content> {
    match token {
        EMPTY_TOKEN => return Some(Content::Empty),
        STONE_TOKEN => return Some(Content::Stone),
        _ => {}
    }

    let mut chars = token.chars();
    let kind = Kind::from_letter(chars.next()?)?;
    let piece = match chars.next() {
        None => Piece::new(kind),
        Some(suffix) => Piece::with_power_up(kind, PowerUp::from_suffix(suffix)?),
    };
    if chars.next().is_some() {
        return None;
    }
    Some(Content::Piece(piece))
}

fn token(content: &Content) -> String {
    match content {
        Content::Empty => EMPTY_TOKEN.to_owned(),
        Content::Stone => STONE_TOKEN.to_owned(),
        Content::Piece(piece) => {
            let mut token = piece.kind().letter().to_string();
            if let Some(power_up) = piece.power_up() {
                token.push(power_up.suffix());
            }
            token
        }
    }
}

/// Errors reported by the grid store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// A coordinate fell outside the grid.
    #[error("cell ({}, {}) lies outside the {columns}x{rows} grid", .cell.column(), .cell.row())]
    OutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
        /// Number of columns of the grid.
        columns: u32,
        /// Number of rows of the grid.
        rows: u32,
    },
}

/// Errors reported while parsing a textual layout.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The layout contained no cells.
    #[error("layout is empty")]
    Empty,
    /// A row held a different number of tokens than the first row.
    #[error("layout line {line} has {found} cells, expected {expected}")]
    Ragged {
        /// Zero-based line index, counted from the top.
        line: usize,
        /// Number of cells on the first line.
        expected: usize,
        /// Number of cells on the offending line.
        found: usize,
    },
    /// A token could not be interpreted.
    #[error("unknown layout token '{token}' at ({}, {})", .cell.column(), .cell.row())]
    UnknownToken {
        /// Token as written.
        token: String,
        /// Cell the token describes.
        cell: CellCoord,
    },
}
