/*!
This module handles random generation of upcoming [`PieceType`]s.

Pieces are dealt in "bags": each bag is one uniformly shuffled permutation
of the allowed piece types, so within any run of consecutive bags every
allowed type appears exactly once per bag.
*/

use std::collections::VecDeque;

use rand::seq::SliceRandom;

use crate::{ConfigError, GameRng, PieceType};

/// A lazy, infinite sequence of piece types, dealt one shuffled bag at a
/// time.
///
/// The queue owns no randomness of its own; the game's seeded PRNG is passed
/// in wherever the internal buffer may need topping up, which keeps whole
/// sessions reproducible from their seed.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PieceQueue {
    buffer: VecDeque<PieceType>,
    allowed: Vec<PieceType>,
}

impl PieceQueue {
    /// Creates a queue dealing bags over the given piece types.
    ///
    /// Duplicates in `allowed` are ignored; an empty set is rejected before
    /// any bag could be generated from it.
    pub fn new(allowed: &[PieceType]) -> Result<Self, ConfigError> {
        let mut queue = Self {
            buffer: VecDeque::new(),
            allowed: Vec::new(),
        };
        queue.set_allowed_types(allowed)?;
        Ok(queue)
    }

    /// Restricts future bags to the given piece types.
    ///
    /// Takes effect starting with the next generated bag; already-buffered
    /// pieces are dealt unchanged.
    pub fn set_allowed_types(&mut self, allowed: &[PieceType]) -> Result<(), ConfigError> {
        let canonical: Vec<PieceType> = PieceType::VARIANTS
            .into_iter()
            .filter(|t| allowed.contains(t))
            .collect();
        if canonical.is_empty() {
            return Err(ConfigError::EmptyPieceSet);
        }
        self.allowed = canonical;
        Ok(())
    }

    /// The piece types future bags draw from.
    pub fn allowed_types(&self) -> &[PieceType] {
        &self.allowed
    }

    /// Pops and returns the next piece type, refilling the buffer with a
    /// freshly shuffled bag whenever it runs dry.
    pub fn next(&mut self, rng: &mut GameRng) -> PieceType {
        loop {
            if let Some(piece_type) = self.buffer.pop_front() {
                return piece_type;
            }
            self.push_bag(rng);
        }
    }

    /// Puts a piece type back at the head of the queue, to be dealt next.
    ///
    /// Used when a held piece is swapped back into play.
    pub fn push_front(&mut self, piece_type: PieceType) {
        self.buffer.push_front(piece_type);
    }

    /// Appends whole shuffled bags until at least `min_len` pieces are
    /// buffered, e.g. to honor a preview length.
    pub fn top_up(&mut self, min_len: usize, rng: &mut GameRng) {
        while self.buffer.len() < min_len {
            self.push_bag(rng);
        }
    }

    /// Read access to the buffered upcoming piece types, in play order.
    pub fn queued(&self) -> impl Iterator<Item = PieceType> + '_ {
        self.buffer.iter().copied()
    }

    fn push_bag(&mut self, rng: &mut GameRng) {
        let mut bag = self.allowed.clone();
        bag.shuffle(rng);
        self.buffer.extend(bag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;

    #[test]
    fn every_bag_is_a_permutation_of_the_allowed_set() {
        let mut rng = GameRng::seed_from_u64(7);
        let mut queue = PieceQueue::new(&PieceType::VARIANTS).unwrap();
        for _ in 0..20 {
            let mut bag: Vec<PieceType> = (0..7).map(|_| queue.next(&mut rng)).collect();
            bag.sort_unstable();
            assert_eq!(bag, PieceType::VARIANTS.to_vec());
        }
    }

    #[test]
    fn restricting_the_allowed_set_applies_to_the_next_bag() {
        let mut rng = GameRng::seed_from_u64(7);
        let mut queue = PieceQueue::new(&PieceType::VARIANTS).unwrap();
        // Buffer a full bag, then restrict mid-bag.
        queue.top_up(7, &mut rng);
        queue.set_allowed_types(&[PieceType::T]).unwrap();
        let mut first_bag: Vec<PieceType> = (0..7).map(|_| queue.next(&mut rng)).collect();
        first_bag.sort_unstable();
        assert_eq!(first_bag, PieceType::VARIANTS.to_vec());
        // Everything after the already-generated bag is a T.
        for _ in 0..5 {
            assert_eq!(queue.next(&mut rng), PieceType::T);
        }
    }

    #[test]
    fn empty_allowed_set_is_rejected() {
        assert_eq!(PieceQueue::new(&[]), Err(ConfigError::EmptyPieceSet));
        let mut queue = PieceQueue::new(&[PieceType::I]).unwrap();
        assert_eq!(queue.set_allowed_types(&[]), Err(ConfigError::EmptyPieceSet));
        // The failed reconfiguration left the queue usable.
        let mut rng = GameRng::seed_from_u64(7);
        assert_eq!(queue.next(&mut rng), PieceType::I);
    }

    #[test]
    fn identical_seeds_deal_identical_sequences() {
        let mut rng_a = GameRng::seed_from_u64(123);
        let mut rng_b = GameRng::seed_from_u64(123);
        let mut queue_a = PieceQueue::new(&PieceType::VARIANTS).unwrap();
        let mut queue_b = PieceQueue::new(&PieceType::VARIANTS).unwrap();
        for _ in 0..30 {
            assert_eq!(queue_a.next(&mut rng_a), queue_b.next(&mut rng_b));
        }
    }
}
