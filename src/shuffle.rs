extern crate alloc;
use alloc::vec::Vec;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Restartable, non-repeating random permutation over sample indices.
///
/// Each pass visits every index exactly once; when a pass is exhausted the
/// order is reshuffled and the cursor restarts. Seeded for reproducibility.
#[derive(Debug, Clone)]
pub struct SampleShuffler {
    order: Vec<u32>,
    cursor: usize,
    rng: Pcg32,
}

impl SampleShuffler {
    pub fn new(len: usize, seed: u64) -> Self {
        let mut shuffler = Self {
            order: (0..len as u32).collect(),
            cursor: 0,
            rng: Pcg32::seed_from_u64(seed),
        };
        shuffler.reshuffle();
        shuffler
    }

    /// Next sample index. Reshuffles and restarts after a full pass.
    /// Must not be called on an empty shuffler.
    pub fn next_index(&mut self) -> usize {
        if self.cursor >= self.order.len() {
            self.reshuffle();
        }
        let index = self.order[self.cursor];
        self.cursor += 1;
        index as usize
    }

    fn reshuffle(&mut self) {
        // Fisher-Yates
        for i in (1..self.order.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            self.order.swap(i, j);
        }
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Process-random seed used when the configuration provides none.
#[cfg(feature = "std")]
pub(crate) fn entropy_seed() -> u64 {
    rand::random()
}

#[cfg(not(feature = "std"))]
pub(crate) fn entropy_seed() -> u64 {
    0x9e37_79b9_7f4a_7c15
}
