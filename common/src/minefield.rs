use crate::Point;
use rand::Rng;
use rand::seq::index;
use std::collections::HashSet;
use std::fmt;

/// The hidden layout of mines for one game, fixed once placed.
#[derive(Debug, Clone)]
pub struct Minefield {
    height: usize,
    width: usize,
    mines: HashSet<Point>,
    /// Cells the player has flagged as mines.
    flagged: HashSet<Point>,
}

impl Minefield {
    /// Places `mines` mines uniformly at random, without replacement.
    pub fn new<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> anyhow::Result<Self> {
        let Some(cells) = height.checked_mul(width) else {
            anyhow::bail!("a {height}x{width} board has too many cells");
        };
        if cells == 0 {
            anyhow::bail!("board must have at least one cell");
        }
        if mines >= cells {
            anyhow::bail!("total mines ({mines}) must be less than the number of cells ({cells})");
        }

        let mines = index::sample(rng, cells, mines)
            .into_iter()
            .map(|i| Point::new(i / width, i % width))
            .collect();
        Ok(Minefield {
            height,
            width,
            mines,
            flagged: HashSet::new(),
        })
    }

    /// A minefield with a fixed layout.
    pub fn from_mines(
        height: usize,
        width: usize,
        mines: impl IntoIterator<Item = Point>,
    ) -> anyhow::Result<Self> {
        let mines: HashSet<Point> = mines.into_iter().collect();
        if let Some(point) = mines.iter().find(|p| !p.in_bounds(height, width)) {
            anyhow::bail!("mine {point} is outside the {height}x{width} board");
        }
        Ok(Minefield {
            height,
            width,
            mines,
            flagged: HashSet::new(),
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn mines(&self) -> &HashSet<Point> {
        &self.mines
    }

    pub fn mine_count(&self) -> usize {
        self.mines.len()
    }

    pub fn is_mine(&self, point: Point) -> bool {
        self.mines.contains(&point)
    }

    /// Number of mines within one row and column of `point`, excluding itself.
    pub fn nearby_mines(&self, point: Point) -> usize {
        point
            .neighbors(self.height, self.width)
            .filter(|neighbor| self.is_mine(*neighbor))
            .count()
    }

    /// Flags `point` as a mine. Returns whether the flag is new.
    pub fn flag(&mut self, point: Point) -> bool {
        self.flagged.insert(point)
    }

    pub fn flagged(&self) -> &HashSet<Point> {
        &self.flagged
    }

    /// The game is won once the flags match the mines exactly.
    pub fn won(&self) -> bool {
        self.flagged == self.mines
    }
}

/// Shows where the mines are.
impl fmt::Display for Minefield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "--".repeat(self.width) + "-";
        for row in 0..self.height {
            writeln!(f, "{rule}")?;
            for col in 0..self.width {
                let mark = if self.is_mine(Point { row, col }) { 'X' } else { ' ' };
                write!(f, "|{mark}")?;
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "{rule}")
    }
}
