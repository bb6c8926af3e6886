use crate::knowledge::KnowledgeBase;
use crate::minefield::Minefield;
use crate::{Cell, GameState, Point};
use rand::Rng;
use tracing::{debug, info};

/// How the bot arrived at a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// The cell was proven safe.
    Safe,
    /// No cell was proven safe, so the bot guessed.
    Guess,
}

/// A single revealed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub point: Point,
    pub kind: MoveKind,
    /// Mines around the cell, or `None` if the cell was a mine.
    pub nearby: Option<usize>,
}

/// Summary of a game, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GameReport {
    pub state: GameState,
    pub height: usize,
    pub width: usize,
    pub mines: usize,
    pub moves: usize,
    pub guesses: usize,
    pub flagged: usize,
}

/// One game session: a hidden minefield and the bot playing it.
pub struct Game {
    minefield: Minefield,
    agent: KnowledgeBase,
    /// The visible state of the board.
    board: Vec<Vec<Cell>>,
    moves: Vec<Move>,
    pub game_state: GameState,
}

impl Game {
    pub fn new(minefield: Minefield) -> Self {
        let (height, width) = (minefield.height(), minefield.width());
        Game {
            agent: KnowledgeBase::new(height, width),
            board: vec![vec![Cell::Hidden; width]; height],
            minefield,
            moves: Vec::new(),
            game_state: GameState::Playing,
        }
    }

    pub fn board(&self) -> &[Vec<Cell>] {
        &self.board
    }

    pub fn agent(&self) -> &KnowledgeBase {
        &self.agent
    }

    pub fn minefield(&self) -> &Minefield {
        &self.minefield
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Plays one move.
    ///
    /// 1. Picks a cell proven safe, or guesses if there is none.
    /// 2. Reveals it; hitting a mine loses the game.
    /// 3. Feeds the mine count back to the bot.
    /// 4. Flags every mine the bot now knows about.
    /// 5. Checks for a win.
    ///
    /// Returns `None` when the bot has no move left.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> anyhow::Result<Option<Move>> {
        if self.game_state != GameState::Playing {
            anyhow::bail!("game_ended");
        }

        // --- 1. Choose ---
        let (point, kind) = match self.agent.pick_known_safe() {
            Some(point) => (point, MoveKind::Safe),
            None => match self.agent.pick_random(rng) {
                Some(point) => (point, MoveKind::Guess),
                None => return Ok(None),
            },
        };
        debug!(%point, ?kind, "move chosen");

        // --- 2. Reveal ---
        if self.minefield.is_mine(point) {
            self.board[point.row][point.col] = Cell::Mine;
            self.game_state = GameState::Lost;
            let mv = Move {
                point,
                kind,
                nearby: None,
            };
            self.moves.push(mv);
            return Ok(Some(mv));
        }

        // --- 3. Observe ---
        let nearby = self.minefield.nearby_mines(point);
        self.agent.observe(point, nearby)?;
        self.board[point.row][point.col] = Cell::Revealed(u8::try_from(nearby)?);

        // --- 4. Flag ---
        for &mine in self.agent.known_mines() {
            if self.minefield.flag(mine) {
                self.board[mine.row][mine.col] = Cell::Flagged;
            }
        }

        // --- 5. Check for Win Condition ---
        if self.minefield.won() {
            self.game_state = GameState::Won;
        }

        let mv = Move {
            point,
            kind,
            nearby: Some(nearby),
        };
        self.moves.push(mv);
        Ok(Some(mv))
    }

    /// Plays until the game is won, lost, or the bot runs out of moves.
    pub fn play<R: Rng + ?Sized>(&mut self, rng: &mut R) -> anyhow::Result<GameReport> {
        while self.game_state == GameState::Playing {
            if self.step(rng)?.is_none() {
                break;
            }
        }
        let report = self.report();
        info!(
            state = ?report.state,
            moves = report.moves,
            guesses = report.guesses,
            "game finished"
        );
        Ok(report)
    }

    pub fn report(&self) -> GameReport {
        GameReport {
            state: self.game_state,
            height: self.minefield.height(),
            width: self.minefield.width(),
            mines: self.minefield.mine_count(),
            moves: self.moves.len(),
            guesses: self
                .moves
                .iter()
                .filter(|mv| mv.kind == MoveKind::Guess)
                .count(),
            flagged: self.minefield.flagged().len(),
        }
    }
}
