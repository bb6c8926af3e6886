use crate::Point;
use crate::error::{KnowledgeError, Result};
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

/// A logical statement about the board: exactly `count` of `cells` are mines.
///
/// For example, a revealed '1' with three hidden neighbors becomes the sentence
/// `{a, b, c} = 1`. Cells are kept in a sorted set, so two sentences compare and
/// hash equal whenever they assert the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sentence {
    cells: BTreeSet<Point>,
    count: usize,
}

impl Sentence {
    /// Builds a sentence, rejecting one that claims more mines than it has cells.
    pub fn new(cells: impl IntoIterator<Item = Point>, count: usize) -> Result<Self> {
        let cells: BTreeSet<Point> = cells.into_iter().collect();
        if count > cells.len() {
            return Err(KnowledgeError::Overcount {
                count,
                cells: cells.len(),
            });
        }
        Ok(Sentence { cells, count })
    }

    pub fn cells(&self) -> &BTreeSet<Point> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, point: Point) -> bool {
        self.cells.contains(&point)
    }

    /// Every cell, if the count accounts for all of them; otherwise nothing.
    pub fn known_mines(&self) -> BTreeSet<Point> {
        if self.count == self.cells.len() {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Every cell, if the count is zero; otherwise nothing.
    pub fn known_safes(&self) -> BTreeSet<Point> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Checks that `point` may be taken out of this sentence as a mine.
    pub(crate) fn check_mine(&self, point: Point) -> Result<()> {
        if self.contains(point) && self.count == 0 {
            return Err(KnowledgeError::Undercount { point });
        }
        Ok(())
    }

    /// Checks that `point` may be taken out of this sentence as a safe cell.
    pub(crate) fn check_safe(&self, point: Point) -> Result<()> {
        if self.contains(point) && self.count == self.cells.len() {
            return Err(KnowledgeError::Overcount {
                count: self.count,
                cells: self.cells.len() - 1,
            });
        }
        Ok(())
    }

    /// Removes a known mine, which is now accounted for outside the sentence.
    /// Returns whether the sentence changed.
    pub fn mark_mine(&mut self, point: Point) -> Result<bool> {
        self.check_mine(point)?;
        if self.cells.remove(&point) {
            self.count -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// Removes a known safe cell; the count is unchanged.
    /// Returns whether the sentence changed.
    pub fn mark_safe(&mut self, point: Point) -> Result<bool> {
        self.check_safe(point)?;
        Ok(self.cells.remove(&point))
    }

    pub fn is_subset(&self, other: &Sentence) -> bool {
        self.cells.is_subset(&other.cells)
    }

    /// Subset resolution: if `subset.cells ⊆ self.cells`, the cells only in `self`
    /// hold exactly `self.count - subset.count` mines.
    ///
    /// Returns `Ok(None)` when `subset` is not actually a subset.
    pub fn resolve_against(&self, subset: &Sentence) -> Result<Option<Sentence>> {
        if !subset.is_subset(self) {
            return Ok(None);
        }
        let remaining = self.cells.difference(&subset.cells).copied();
        let Some(count) = self.count.checked_sub(subset.count) else {
            return Err(KnowledgeError::Contradiction {
                subset: subset.clone(),
                superset: self.clone(),
            });
        };
        Sentence::new(remaining, count).map(Some)
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}} = {}", self.cells.iter().join(", "), self.count)
    }
}
