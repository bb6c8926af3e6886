use crate::Point;
use crate::error::{KnowledgeError, Result};
use crate::sentence::Sentence;
use itertools::Itertools;
use rand::Rng;
use rand::prelude::IndexedRandom;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

/// Cells newly classified while processing one observation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inference {
    pub safes: BTreeSet<Point>,
    pub mines: BTreeSet<Point>,
    /// Number of fixpoint passes that produced at least one candidate.
    pub passes: usize,
}

impl Inference {
    pub fn is_empty(&self) -> bool {
        self.safes.is_empty() && self.mines.is_empty()
    }
}

/// Everything one player knows about one board.
///
/// Holds the cells already clicked, the cells proven safe or mined, and the
/// live set of sentences. Each game session owns its own instance.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    height: usize,
    width: usize,
    moves_made: HashSet<Point>,
    mines: HashSet<Point>,
    safes: HashSet<Point>,
    knowledge: Vec<Sentence>,
}

impl KnowledgeBase {
    pub fn new(height: usize, width: usize) -> Self {
        KnowledgeBase {
            height,
            width,
            moves_made: HashSet::new(),
            mines: HashSet::new(),
            safes: HashSet::new(),
            knowledge: Vec::new(),
        }
    }

    pub fn moves_made(&self) -> &HashSet<Point> {
        &self.moves_made
    }

    pub fn known_mines(&self) -> &HashSet<Point> {
        &self.mines
    }

    pub fn known_safes(&self) -> &HashSet<Point> {
        &self.safes
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.knowledge
    }

    pub fn is_known_mine(&self, point: Point) -> bool {
        self.mines.contains(&point)
    }

    pub fn is_known_safe(&self, point: Point) -> bool {
        self.safes.contains(&point)
    }

    fn check_bounds(&self, point: Point) -> Result<()> {
        if !point.in_bounds(self.height, self.width) {
            return Err(KnowledgeError::OutOfBounds {
                point,
                height: self.height,
                width: self.width,
            });
        }
        Ok(())
    }

    /// Records `point` as a mine and removes it from every sentence.
    ///
    /// Nothing changes if the fact contradicts what is already known.
    /// Returns whether the mine was new.
    pub fn mark_mine(&mut self, point: Point) -> Result<bool> {
        self.check_bounds(point)?;
        if self.safes.contains(&point) {
            return Err(KnowledgeError::Conflict { point });
        }
        for sentence in &self.knowledge {
            sentence.check_mine(point)?;
        }

        let added = self.mines.insert(point);
        for sentence in &mut self.knowledge {
            sentence.mark_mine(point)?;
        }
        trace!(%point, added, "marked mine");
        Ok(added)
    }

    /// Records `point` as safe and removes it from every sentence.
    ///
    /// Nothing changes if the fact contradicts what is already known.
    /// Returns whether the safe cell was new.
    pub fn mark_safe(&mut self, point: Point) -> Result<bool> {
        self.check_bounds(point)?;
        if self.mines.contains(&point) {
            return Err(KnowledgeError::Conflict { point });
        }
        for sentence in &self.knowledge {
            sentence.check_safe(point)?;
        }

        let added = self.safes.insert(point);
        for sentence in &mut self.knowledge {
            sentence.mark_safe(point)?;
        }
        trace!(%point, added, "marked safe");
        Ok(added)
    }

    /// Called when the board reports that the safe cell `point` has `count`
    /// mines among its neighbors.
    ///
    /// 1. Marks the cell as a move made and as safe.
    /// 2. Adds a sentence over its unresolved neighbors, discounting known mines.
    /// 3. Derives new sentences from subset pairs (one pass).
    /// 4. Marks every cell the sentences pin down, until nothing new turns up.
    /// 5. Drops emptied and duplicate sentences.
    ///
    /// Input that contradicts the current knowledge is rejected before anything
    /// is recorded. An error from steps 3 or 4 means earlier observations were
    /// inconsistent, and the knowledge base should be discarded.
    pub fn observe(&mut self, point: Point, count: usize) -> Result<Inference> {
        self.check_bounds(point)?;
        if self.mines.contains(&point) {
            return Err(KnowledgeError::Conflict { point });
        }

        let unresolved: Vec<Point> = point
            .neighbors(self.height, self.width)
            .filter(|neighbor| !self.safes.contains(neighbor))
            .collect();
        let known_mines = unresolved
            .iter()
            .filter(|neighbor| self.mines.contains(*neighbor))
            .count();
        let adjusted = count
            .checked_sub(known_mines)
            .ok_or(KnowledgeError::NegativeCount {
                point,
                count,
                known_mines,
            })?;
        let sentence = Sentence::new(
            unresolved
                .into_iter()
                .filter(|neighbor| !self.mines.contains(neighbor)),
            adjusted,
        )?;

        self.mark_safe(point)?;
        self.moves_made.insert(point);

        if !sentence.is_empty() && !self.knowledge.contains(&sentence) {
            debug!(%point, count, %sentence, "new sentence");
            self.knowledge.push(sentence);
        }

        self.resolve()?;
        let inference = self.deduce()?;
        self.prune();

        debug!(
            %point,
            safes = inference.safes.len(),
            mines = inference.mines.len(),
            passes = inference.passes,
            sentences = self.knowledge.len(),
            "observation processed"
        );
        Ok(inference)
    }

    /// For every pair where one sentence's cells are a subset of another's,
    /// adds the sentence over the difference.
    ///
    /// Sentences derived here are not resolved against each other until the
    /// next call. Returns the number of sentences added.
    fn resolve(&mut self) -> Result<usize> {
        let mut inferred: Vec<Sentence> = Vec::new();

        for (subset, superset) in self.knowledge.iter().cartesian_product(&self.knowledge) {
            if subset == superset {
                continue;
            }
            let Some(sentence) = superset.resolve_against(subset)? else {
                continue;
            };
            if !self.knowledge.contains(&sentence) && !inferred.contains(&sentence) {
                debug!(%subset, %superset, %sentence, "inferred sentence");
                inferred.push(sentence);
            }
        }

        let added = inferred.len();
        self.knowledge.extend(inferred);
        Ok(added)
    }

    /// Repeatedly collects the cells some sentence proves safe or mined and
    /// marks them, until a full scan yields no candidates.
    fn deduce(&mut self) -> Result<Inference> {
        let mut inference = Inference::default();

        loop {
            let mut safes = BTreeSet::new();
            let mut mines = BTreeSet::new();
            for sentence in &self.knowledge {
                safes.extend(sentence.known_safes());
                mines.extend(sentence.known_mines());
            }

            if safes.is_empty() && mines.is_empty() {
                break;
            }
            inference.passes += 1;
            debug!(
                pass = inference.passes,
                safes = safes.len(),
                mines = mines.len(),
                "deduction pass"
            );

            for point in safes {
                if self.mark_safe(point)? {
                    inference.safes.insert(point);
                }
            }
            for point in mines {
                if self.mark_mine(point)? {
                    inference.mines.insert(point);
                }
            }
        }

        Ok(inference)
    }

    /// Drops sentences with no cells left, and all but one copy of duplicates.
    fn prune(&mut self) {
        let mut seen = HashSet::new();
        self.knowledge
            .retain(|sentence| !sentence.is_empty() && seen.insert(sentence.clone()));
    }

    /// A cell known to be safe that has not been clicked yet, if any.
    pub fn pick_known_safe(&self) -> Option<Point> {
        self.safes
            .iter()
            .filter(|point| !self.moves_made.contains(*point))
            .min()
            .copied()
    }

    /// A random cell that is neither clicked nor a known mine.
    ///
    /// Prefers cells no sentence mentions; only when every candidate is
    /// constrained does it pick among the constrained ones. `None` once the
    /// board is exhausted.
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Point> {
        let constrained: HashSet<Point> = self
            .knowledge
            .iter()
            .flat_map(|sentence| sentence.cells())
            .copied()
            .collect();

        let open: Vec<Point> = self
            .points()
            .filter(|point| !self.moves_made.contains(point) && !self.mines.contains(point))
            .collect();
        let unconstrained: Vec<Point> = open
            .iter()
            .filter(|point| !constrained.contains(*point))
            .copied()
            .collect();

        if let Some(&point) = unconstrained.choose(rng) {
            return Some(point);
        }
        trace!(candidates = open.len(), "no unconstrained cell, guessing among constrained");
        open.choose(rng).copied()
    }

    /// Every cell on the board in row-major order.
    fn points(&self) -> impl Iterator<Item = Point> {
        (0..self.height)
            .cartesian_product(0..self.width)
            .map(|(row, col)| Point { row, col })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn p(row: usize, col: usize) -> Point {
        Point::new(row, col)
    }

    fn sentence(cells: &[Point], count: usize) -> Sentence {
        Sentence::new(cells.iter().copied(), count).unwrap()
    }

    #[test]
    fn test_resolution_yields_safe_cell() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.knowledge.push(sentence(&[p(0, 0), p(0, 1)], 1));
        kb.knowledge.push(sentence(&[p(0, 0), p(0, 1), p(0, 2)], 1));

        assert_eq!(kb.resolve().unwrap(), 1);
        assert!(kb.knowledge.contains(&sentence(&[p(0, 2)], 0)));

        let inference = kb.deduce().unwrap();
        assert_eq!(inference.safes, BTreeSet::from([p(0, 2)]));
        assert!(kb.is_known_safe(p(0, 2)));
    }

    #[test]
    fn test_resolution_skips_known_and_repeated_sentences() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.knowledge.push(sentence(&[p(0, 0)], 0));
        kb.knowledge.push(sentence(&[p(0, 0), p(0, 1)], 1));
        kb.knowledge.push(sentence(&[p(0, 1)], 1));

        // {(0,0),(0,1)} - {(0,0)} = {(0,1)} = 1 is already present,
        // {(0,0),(0,1)} - {(0,1)} = {(0,0)} = 0 likewise.
        assert_eq!(kb.resolve().unwrap(), 0);
        assert_eq!(kb.knowledge.len(), 3);
    }

    #[test]
    fn test_resolution_adds_shared_derivation_once() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.knowledge.push(sentence(&[p(0, 0)], 0));
        kb.knowledge.push(sentence(&[p(0, 0), p(1, 1)], 1));
        kb.knowledge.push(sentence(&[p(2, 2)], 0));
        kb.knowledge.push(sentence(&[p(2, 2), p(1, 1)], 1));

        // Both pairs derive {(1,1)} = 1 in the same pass.
        assert_eq!(kb.resolve().unwrap(), 1);
        let derived = sentence(&[p(1, 1)], 1);
        assert_eq!(kb.knowledge.iter().filter(|s| **s == derived).count(), 1);
        assert_eq!(kb.knowledge.len(), 5);
    }

    #[test]
    fn test_marked_mine_frees_neighbor() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.knowledge.push(sentence(&[p(0, 0), p(0, 1)], 1));

        assert!(kb.mark_mine(p(0, 0)).unwrap());
        assert_eq!(kb.knowledge, vec![sentence(&[p(0, 1)], 0)]);

        let inference = kb.deduce().unwrap();
        assert_eq!(inference.safes, BTreeSet::from([p(0, 1)]));
        assert_eq!(inference.passes, 1);
    }

    #[test]
    fn test_zero_in_center_clears_whole_board() {
        let mut kb = KnowledgeBase::new(3, 3);
        let inference = kb.observe(p(1, 1), 0).unwrap();

        assert_eq!(inference.safes.len(), 8);
        assert!(inference.mines.is_empty());
        assert_eq!(inference.passes, 1);
        assert_eq!(kb.known_safes().len(), 9);
        assert!(kb.sentences().is_empty());
        assert_eq!(kb.moves_made(), &HashSet::from([p(1, 1)]));
    }

    #[test]
    fn test_observation_sequence_finds_mine() {
        // One row, mine at the far end.
        let mut kb = KnowledgeBase::new(1, 4);

        kb.observe(p(0, 0), 0).unwrap();
        assert_eq!(kb.pick_known_safe(), Some(p(0, 1)));

        kb.observe(p(0, 1), 0).unwrap();
        assert_eq!(kb.pick_known_safe(), Some(p(0, 2)));

        let inference = kb.observe(p(0, 2), 1).unwrap();
        assert_eq!(inference.mines, BTreeSet::from([p(0, 3)]));
        assert_eq!(kb.pick_known_safe(), None);
        assert!(kb.sentences().is_empty());
    }

    #[test]
    fn test_observe_discounts_known_mines() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.mark_mine(p(0, 0)).unwrap();

        // Edge cell (1,0) touches (0,0),(0,1),(1,1),(2,0),(2,1); one mine is already known.
        kb.observe(p(1, 0), 2).unwrap();
        assert_eq!(
            kb.sentences(),
            &[sentence(&[p(0, 1), p(1, 1), p(2, 0), p(2, 1)], 1)]
        );
    }

    #[test]
    fn test_observe_skips_empty_sentence() {
        let mut kb = KnowledgeBase::new(1, 2);
        kb.mark_safe(p(0, 1)).unwrap();
        let inference = kb.observe(p(0, 0), 0).unwrap();
        assert!(inference.is_empty());
        assert!(kb.sentences().is_empty());
    }

    #[test]
    fn test_negative_count_is_rejected_without_changes() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.mark_mine(p(0, 0)).unwrap();

        assert_eq!(
            kb.observe(p(1, 1), 0),
            Err(KnowledgeError::NegativeCount {
                point: p(1, 1),
                count: 0,
                known_mines: 1,
            })
        );
        assert!(kb.moves_made().is_empty());
        assert!(!kb.is_known_safe(p(1, 1)));
    }

    #[test]
    fn test_count_above_neighbors_is_rejected() {
        let mut kb = KnowledgeBase::new(3, 3);
        assert_eq!(
            kb.observe(p(0, 0), 4),
            Err(KnowledgeError::Overcount { count: 4, cells: 3 })
        );
    }

    #[test]
    fn test_conflicting_annotations_are_rejected() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.mark_mine(p(2, 2)).unwrap();
        assert_eq!(
            kb.mark_safe(p(2, 2)),
            Err(KnowledgeError::Conflict { point: p(2, 2) })
        );
        assert_eq!(
            kb.observe(p(2, 2), 0),
            Err(KnowledgeError::Conflict { point: p(2, 2) })
        );

        kb.mark_safe(p(0, 0)).unwrap();
        assert_eq!(
            kb.mark_mine(p(0, 0)),
            Err(KnowledgeError::Conflict { point: p(0, 0) })
        );
        assert!(kb.known_mines().is_disjoint(kb.known_safes()));
    }

    #[test]
    fn test_mark_mine_contradicting_sentence_changes_nothing() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.knowledge.push(sentence(&[p(0, 0), p(0, 1)], 1));
        kb.knowledge.push(sentence(&[p(0, 1), p(0, 2)], 0));

        assert_eq!(
            kb.mark_mine(p(0, 1)),
            Err(KnowledgeError::Undercount { point: p(0, 1) })
        );
        assert!(kb.known_mines().is_empty());
        assert_eq!(kb.knowledge[0], sentence(&[p(0, 0), p(0, 1)], 1));
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let mut kb = KnowledgeBase::new(2, 2);
        let err = kb.observe(p(2, 0), 0).unwrap_err();
        assert_eq!(
            err,
            KnowledgeError::OutOfBounds {
                point: p(2, 0),
                height: 2,
                width: 2,
            }
        );
        assert!(kb.mark_mine(p(0, 5)).is_err());
    }

    #[test]
    fn test_annotation_is_idempotent() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.knowledge.push(sentence(&[p(0, 0), p(0, 1), p(0, 2)], 1));

        assert!(kb.mark_mine(p(0, 0)).unwrap());
        let snapshot = kb.knowledge.clone();
        assert!(!kb.mark_mine(p(0, 0)).unwrap());
        assert_eq!(kb.knowledge, snapshot);

        assert!(kb.mark_safe(p(0, 1)).unwrap());
        let snapshot = kb.knowledge.clone();
        assert!(!kb.mark_safe(p(0, 1)).unwrap());
        assert_eq!(kb.knowledge, snapshot);
    }

    #[test]
    fn test_prune_drops_empty_and_duplicates() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.knowledge.push(sentence(&[p(0, 0), p(1, 1)], 1));
        kb.knowledge.push(sentence(&[p(0, 0), p(2, 2)], 1));
        kb.knowledge.push(sentence(&[], 0));

        // Both collapse to {(0,0)} = 1 once the differing cells are safe.
        kb.mark_safe(p(1, 1)).unwrap();
        kb.mark_safe(p(2, 2)).unwrap();
        kb.prune();

        assert_eq!(kb.knowledge, vec![sentence(&[p(0, 0)], 1)]);
    }

    #[test]
    fn test_pick_known_safe_skips_moves() {
        let mut kb = KnowledgeBase::new(3, 3);
        assert_eq!(kb.pick_known_safe(), None);

        kb.mark_safe(p(0, 0)).unwrap();
        kb.mark_safe(p(2, 1)).unwrap();
        kb.moves_made.insert(p(0, 0));

        assert_eq!(kb.pick_known_safe(), Some(p(2, 1)));
    }

    #[test]
    fn test_pick_random_avoids_constrained_cells() {
        let mut kb = KnowledgeBase::new(1, 5);
        kb.observe(p(0, 0), 1).unwrap();
        // (0,1) is now a known mine.
        kb.knowledge.push(sentence(&[p(0, 2), p(0, 3)], 1));

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(kb.pick_random(&mut rng), Some(p(0, 4)));
        }
    }

    #[test]
    fn test_pick_random_falls_back_to_constrained_cells() {
        let mut kb = KnowledgeBase::new(2, 2);
        kb.observe(p(0, 0), 1).unwrap();
        assert_eq!(kb.sentences().len(), 1);

        let constrained = kb.sentences()[0].cells().clone();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let point = kb.pick_random(&mut rng).unwrap();
            assert!(constrained.contains(&point));
        }
    }

    #[test]
    fn test_pick_random_none_when_exhausted() {
        let mut kb = KnowledgeBase::new(1, 2);
        kb.observe(p(0, 0), 1).unwrap();
        assert!(kb.is_known_mine(p(0, 1)));

        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(kb.pick_random(&mut rng), None);
    }

    #[test]
    fn test_pick_random_is_reproducible() {
        let kb = KnowledgeBase::new(8, 8);
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| kb.pick_random(&mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }
}
