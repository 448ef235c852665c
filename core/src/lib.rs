#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the match-3 board engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative board, and pure systems. Adapters submit [`Command`] values
//! describing player intents, the board executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values that a
//! presentation layer can replay. Systems operate on the [`Grid`] store and
//! never mutate anything they were not handed explicitly.

mod grid;
mod level;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use grid::{Grid, GridError, LayoutError};
pub use level::{ConfigError, LevelConfig, Obstacle, Tuning};

/// Commands that express all permissible board mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests that the pieces in two 4-adjacent cells trade places.
    RequestSwap {
        /// Cell the player dragged from.
        first: CellCoord,
        /// Cell the dragged piece is moved onto.
        second: CellCoord,
    },
    /// Requests that the board freeze its clock while waiting for input.
    Pause,
    /// Requests that a paused board return to accepting swaps.
    Resume,
    /// Advances the board clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the board after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Reports that a new ordinary piece was spawned into an empty cell.
    PieceSpawned {
        /// Cell that received the piece.
        cell: CellCoord,
        /// Kind assigned to the spawned piece.
        kind: Kind,
    },
    /// Confirms that a swap request was accepted and performed.
    PiecesSwapped {
        /// Cell the player dragged from.
        first: CellCoord,
        /// Cell the dragged piece now occupies.
        second: CellCoord,
    },
    /// Reports that a swap produced no match and was undone.
    SwapReverted {
        /// Cell the player dragged from.
        first: CellCoord,
        /// Cell the dragged piece returned from.
        second: CellCoord,
    },
    /// Reports that the content of a cell was destroyed.
    PieceDestroyed {
        /// Cell whose content was removed.
        cell: CellCoord,
        /// Score awarded for the destruction.
        score_delta: u32,
    },
    /// Reports that a power-up piece detonated its footprint.
    PowerUpActivated {
        /// Cell the power-up occupied when it detonated.
        cell: CellCoord,
        /// Power-up that detonated.
        power_up: PowerUp,
    },
    /// Reports that a piece gained a power-up through promotion or conversion.
    PowerUpCreated {
        /// Cell holding the promoted piece.
        cell: CellCoord,
        /// Power-up granted to the piece.
        power_up: PowerUp,
    },
    /// Reports that two swapped power-ups resolved as a combo.
    ComboTriggered {
        /// Combination that was resolved.
        pairing: ComboPairing,
        /// Cells destroyed by the combo, in scan order.
        affected: Vec<CellCoord>,
    },
    /// Reports that an obstacle overlay absorbed damage.
    ObstacleDamaged {
        /// Cell carrying the obstacle.
        cell: CellCoord,
        /// Durability left after the hit. Zero removes the overlay.
        remaining: u32,
    },
    /// Reports that gravity moved the content of a cell downward.
    PieceFell {
        /// Cell the content occupied before falling.
        from: CellCoord,
        /// Cell the content occupies after falling.
        to: CellCoord,
    },
    /// Marks the end of one compaction and refill pass over every column.
    GravityApplied,
    /// Reports that a cascade finished and no further matches remain.
    CascadeSettled,
    /// Reports that a deadlocked board was shuffled.
    Shuffled {
        /// Number of permutations drawn before a playable one was found.
        attempts: u32,
    },
    /// Announces that the board entered a new state.
    StateChanged {
        /// State that became active.
        state: BoardState,
    },
    /// Reports the running score total.
    ScoreChanged {
        /// Score accumulated since the board was created.
        total: u64,
    },
    /// Reports the number of moves left.
    MovesChanged {
        /// Moves the player may still spend.
        remaining: u32,
    },
    /// Suggests a legal swap after the player has been idle long enough.
    HintRevealed {
        /// First cell of the suggested swap.
        first: CellCoord,
        /// Second cell of the suggested swap.
        second: CellCoord,
    },
}

/// Lifecycle states of the move orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardState {
    /// Waiting for the player to request a swap.
    Ready,
    /// Resolving a swap, its cascade, and any follow-up shuffle.
    Resolving,
    /// The score goal was reached.
    Won,
    /// Moves ran out before the score goal was reached.
    Lost,
    /// The board clock is frozen. Only reachable from [`BoardState::Ready`].
    Paused,
}

impl BoardState {
    /// Reports whether the level has ended.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Special resolutions applied when two power-ups (or a color blast and a
/// piece) are swapped with one another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComboPairing {
    /// Two color blasts: every cell on the board is cleared.
    BoardWipe,
    /// Color blast with a line or area blast: pieces of one kind become bombs.
    ColorConversion,
    /// Color blast with an ordinary piece: every piece of that kind is cleared.
    ColorClear,
    /// Line blast with an area blast: three full rows or columns are cleared.
    LineAndArea,
    /// Two line blasts: the union of both footprints is cleared.
    CrossBlast,
    /// Two area blasts: two 3x3 pulses separated by a gravity pass.
    DoubleArea,
}

/// Location of a single cell within the board grid.
///
/// Row zero is the bottom row. Ordering is column-major, which is the scan
/// order used throughout the engine.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell, counted upward from the bottom.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Reports whether the two cells share an edge.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }
}

/// Cardinal directions used when walking the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward increasing row indices.
    Up,
    /// Toward increasing column indices.
    Right,
    /// Toward decreasing row indices.
    Down,
    /// Toward decreasing column indices.
    Left,
}

impl Direction {
    /// Every direction, in clockwise order starting upward.
    pub const ALL: [Direction; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Column and row offsets of a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Self::Up => (0, 1),
            Self::Right => (1, 0),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
        }
    }
}

/// Colour identity of a piece. Pieces of equal kind are matchable.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Red pieces.
    Red,
    /// Orange pieces.
    Orange,
    /// Yellow pieces.
    Yellow,
    /// Green pieces.
    Green,
    /// Blue pieces.
    Blue,
    /// Purple pieces.
    Purple,
}

impl Kind {
    /// Every kind in palette order.
    pub const ALL: [Kind; 6] = [
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Purple,
    ];

    /// Single-letter token used by textual layouts.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Orange => 'O',
            Self::Yellow => 'Y',
            Self::Green => 'G',
            Self::Blue => 'B',
            Self::Purple => 'P',
        }
    }

    /// Resolves a layout letter back into its kind.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.letter() == letter)
    }
}

/// Special behaviour layered on top of a piece's kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUp {
    /// Clears the whole row the piece occupies.
    RowBlast,
    /// Clears the whole column the piece occupies.
    ColumnBlast,
    /// Clears the 3x3 neighbourhood centred on the piece.
    AreaBlast,
    /// Clears every piece of one kind. Never matched by adjacency.
    ColorBlast,
}

impl PowerUp {
    /// Reports whether the power-up clears a full row or column.
    #[must_use]
    pub const fn is_line(self) -> bool {
        matches!(self, Self::RowBlast | Self::ColumnBlast)
    }

    /// Suffix appended to a kind letter in textual layouts.
    #[must_use]
    pub const fn suffix(self) -> char {
        match self {
            Self::RowBlast => '-',
            Self::ColumnBlast => '|',
            Self::AreaBlast => '+',
            Self::ColorBlast => '*',
        }
    }

    /// Resolves a layout suffix back into its power-up.
    #[must_use]
    pub const fn from_suffix(suffix: char) -> Option<Self> {
        match suffix {
            '-' => Some(Self::RowBlast),
            '|' => Some(Self::ColumnBlast),
            '+' => Some(Self::AreaBlast),
            '*' => Some(Self::ColorBlast),
            _ => None,
        }
    }
}

/// A swappable game piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    kind: Kind,
    power_up: Option<PowerUp>,
    #[serde(skip)]
    matched: bool,
    #[serde(skip)]
    swapped: bool,
}

impl Piece {
    /// Creates an ordinary piece of the provided kind.
    #[must_use]
    pub const fn new(kind: Kind) -> Self {
        Self {
            kind,
            power_up: None,
            matched: false,
            swapped: false,
        }
    }

    /// Creates a piece that already carries a power-up.
    #[must_use]
    pub const fn with_power_up(kind: Kind, power_up: PowerUp) -> Self {
        Self {
            kind,
            power_up: Some(power_up),
            matched: false,
            swapped: false,
        }
    }

    /// Kind of the piece.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Power-up carried by the piece, if any.
    #[must_use]
    pub const fn power_up(&self) -> Option<PowerUp> {
        self.power_up
    }

    /// Grants or replaces the piece's power-up.
    pub fn set_power_up(&mut self, power_up: PowerUp) {
        self.power_up = Some(power_up);
    }

    /// Reports whether the piece can take part in adjacency runs.
    #[must_use]
    pub fn is_matchable(&self) -> bool {
        self.power_up != Some(PowerUp::ColorBlast)
    }

    /// Reports whether the current detection pass marked the piece.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        self.matched
    }

    /// Sets the matched marker for the current pass.
    pub fn set_matched(&mut self, matched: bool) {
        self.matched = matched;
    }

    /// Reports whether the piece took part in the swap of the current move.
    #[must_use]
    pub const fn is_swapped(&self) -> bool {
        self.swapped
    }

    /// Sets the swap tie-break marker.
    pub fn set_swapped(&mut self, swapped: bool) {
        self.swapped = swapped;
    }
}

/// Content occupying a single grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Content {
    /// Nothing occupies the cell.
    #[default]
    Empty,
    /// A swappable piece occupies the cell.
    Piece(Piece),
    /// An immovable stone occupies the cell.
    Stone,
}

/// Single storage slot of the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    content: Content,
    durability: u32,
}

impl Cell {
    /// Creates a cell holding the provided content and no obstacle.
    #[must_use]
    pub const fn new(content: Content) -> Self {
        Self {
            content,
            durability: 0,
        }
    }

    /// Creates a cell holding the provided piece.
    #[must_use]
    pub const fn with_piece(piece: Piece) -> Self {
        Self::new(Content::Piece(piece))
    }

    /// Content currently occupying the cell.
    #[must_use]
    pub const fn content(&self) -> &Content {
        &self.content
    }

    /// Replaces the content of the cell, leaving the obstacle untouched.
    pub fn set_content(&mut self, content: Content) {
        self.content = content;
    }

    /// Removes and returns the content of the cell.
    pub fn take_content(&mut self) -> Content {
        std::mem::take(&mut self.content)
    }

    /// Piece occupying the cell, if the content is a piece.
    #[must_use]
    pub const fn piece(&self) -> Option<&Piece> {
        match &self.content {
            Content::Piece(piece) => Some(piece),
            _ => None,
        }
    }

    /// Mutable access to the piece occupying the cell.
    pub fn piece_mut(&mut self) -> Option<&mut Piece> {
        match &mut self.content {
            Content::Piece(piece) => Some(piece),
            _ => None,
        }
    }

    /// Reports whether nothing occupies the cell.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.content, Content::Empty)
    }

    /// Reports whether a stone occupies the cell.
    #[must_use]
    pub const fn is_stone(&self) -> bool {
        matches!(self.content, Content::Stone)
    }

    /// Remaining obstacle durability. Zero means the cell carries no obstacle.
    #[must_use]
    pub const fn durability(&self) -> u32 {
        self.durability
    }

    /// Overwrites the obstacle durability.
    pub fn set_durability(&mut self, durability: u32) {
        self.durability = durability;
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, CellCoord, Content, Kind, LevelConfig, Piece, PowerUp};
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn adjacency_requires_a_shared_edge() {
        let origin = CellCoord::new(2, 2);
        assert!(origin.is_adjacent(CellCoord::new(2, 3)));
        assert!(origin.is_adjacent(CellCoord::new(1, 2)));
        assert!(!origin.is_adjacent(CellCoord::new(3, 3)));
        assert!(!origin.is_adjacent(origin));
    }

    #[test]
    fn scan_order_is_column_major() {
        let mut cells = vec![
            CellCoord::new(1, 0),
            CellCoord::new(0, 2),
            CellCoord::new(0, 1),
        ];
        cells.sort();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 1),
                CellCoord::new(0, 2),
                CellCoord::new(1, 0)
            ]
        );
    }

    #[test]
    fn color_blast_is_never_matchable() {
        let bomb = Piece::with_power_up(Kind::Red, PowerUp::ColorBlast);
        let row = Piece::with_power_up(Kind::Red, PowerUp::RowBlast);
        assert!(!bomb.is_matchable());
        assert!(row.is_matchable());
        assert!(Piece::new(Kind::Red).is_matchable());
    }

    #[test]
    fn layout_letters_resolve_back_to_kinds() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_letter(kind.letter()), Some(kind));
        }
        assert_eq!(Kind::from_letter('x'), None);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn cell_round_trips_through_bincode() {
        let mut cell = Cell::with_piece(Piece::with_power_up(Kind::Blue, PowerUp::AreaBlast));
        cell.set_durability(2);
        assert_round_trip(&cell);
        assert_round_trip(&Cell::new(Content::Stone));
    }

    #[test]
    fn transient_flags_are_not_serialized() {
        let mut piece = Piece::new(Kind::Green);
        piece.set_matched(true);
        piece.set_swapped(true);
        let bytes = bincode::serialize(&piece).expect("serialize");
        let restored: Piece = bincode::deserialize(&bytes).expect("deserialize");
        assert!(!restored.is_matched());
        assert!(!restored.is_swapped());
        assert_eq!(restored.kind(), Kind::Green);
    }

    #[test]
    fn level_config_round_trips_through_bincode() {
        assert_round_trip(&LevelConfig::default());
    }
}
