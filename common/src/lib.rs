use std::fmt;

mod error;
mod game;
mod knowledge;
mod minefield;
mod sentence;

pub use error::KnowledgeError;
pub use game::{Game, GameReport, Move, MoveKind};
pub use knowledge::{Inference, KnowledgeBase};
pub use minefield::Minefield;
pub use sentence::Sentence;

/// Represents a 2D coordinate on the minesweeper board.
///
/// Ordered row-major, so sets of points iterate in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub const fn new(row: usize, col: usize) -> Self {
        Point { row, col }
    }

    /// Whether the point lies on a `height` x `width` board.
    pub fn in_bounds(self, height: usize, width: usize) -> bool {
        self.row < height && self.col < width
    }

    /// All valid neighbor coordinates on a `height` x `width` board.
    /// Handles board edges and corners; never yields the point itself.
    pub fn neighbors(self, height: usize, width: usize) -> impl Iterator<Item = Point> {
        (-1..=1isize).flat_map(move |dr| {
            (-1..=1isize).filter_map(move |dc| {
                if dr == 0 && dc == 0 {
                    return None;
                }

                let row = self.row.checked_add_signed(dr)?;
                let col = self.col.checked_add_signed(dc)?;
                let neighbor = Point { row, col };
                neighbor.in_bounds(height, width).then_some(neighbor)
            })
        })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// What the player can see of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Hidden,
    Revealed(u8), // The u8 is the number of adjacent mines.
    Flagged,
    Mine, // A revealed mine; the game is lost.
}

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Playing,
    Won,
    Lost,
}
