//! Error types for the deduction engine.

use crate::{Point, Sentence};
use thiserror::Error;

/// Invalid-state conditions raised by [`crate::KnowledgeBase`] and [`crate::Sentence`].
///
/// Every variant means the caller fed the engine data that contradicts what it
/// already knows. None of them are recoverable by retrying the same call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeError {
    /// A cell outside the board was observed or annotated.
    #[error("cell {point} is outside the {height}x{width} board")]
    OutOfBounds {
        point: Point,
        height: usize,
        width: usize,
    },

    /// More mines are already known around the cell than it reported.
    #[error("cell {point} reported {count} nearby mines but {known_mines} are already known")]
    NegativeCount {
        point: Point,
        count: usize,
        known_mines: usize,
    },

    /// A sentence would claim more mines than it has cells.
    #[error("sentence claims {count} mines among {cells} cells")]
    Overcount { count: usize, cells: usize },

    /// A mine was marked inside a sentence that already has no mines left.
    #[error("cell {point} marked as a mine in a sentence with no mines left")]
    Undercount { point: Point },

    /// A sentence holds more mines than a sentence covering all of its cells.
    #[error("{subset} holds more mines than its superset {superset}")]
    Contradiction { subset: Sentence, superset: Sentence },

    /// A cell would be classified as both safe and a mine.
    #[error("cell {point} is classified as both safe and a mine")]
    Conflict { point: Point },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;
