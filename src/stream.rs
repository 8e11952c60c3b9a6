//! Update stream generation for harnesses and benchmarks.

use crate::points::Key;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One update of a dynamic point set.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub key: Key,
    pub point: Vec<f64>,
    pub is_insert: bool,
}

/// A deterministic, replayable sequence of updates.
pub trait UpdateStream {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`-th update of the stream.
    fn update(&self, i: usize) -> Update;
}

/// Sliding-window stream over a fixed dataset.
///
/// The stream first inserts `window` points, then alternates deleting the
/// oldest live point with inserting the next one, so exactly `window` points
/// are live through the middle of the stream, and finally deletes the
/// remaining points oldest-first. Every point is inserted exactly once and
/// deleted exactly once, giving a stream of length 2n.
pub struct SlidingWindow {
    n: usize,
    window: usize,
    data: Vec<Vec<f64>>,
    perm: Vec<usize>,
}

impl SlidingWindow {
    /// A window over `data` in its given order.
    pub fn new(data: Vec<Vec<f64>>, window: usize) -> Self {
        let n = data.len();
        Self {
            n,
            window: window.min(n),
            data,
            perm: (0..n).collect(),
        }
    }

    /// A window over `data` in a seeded random order.
    pub fn shuffled(data: Vec<Vec<f64>>, window: usize, seed: u64) -> Self {
        let mut stream = Self::new(data, window);
        let mut rng = StdRng::seed_from_u64(seed);
        stream.perm.shuffle(&mut rng);
        stream
    }

    // Index of the point an update refers to. Keys are assigned in
    // insertion order, so the alternating middle phase maps update i back
    // to the point being inserted or deleted.
    fn key(&self, i: usize) -> usize {
        if i < self.window {
            i
        } else if i > self.window - 1 + 2 * (self.n - self.window) {
            i - self.n
        } else if (i - self.window) % 2 == 1 {
            (i + self.window - 1) / 2
        } else {
            (i - self.window) / 2
        }
    }

    fn is_insert(&self, i: usize) -> bool {
        i < self.window
            || (i <= self.window - 1 + 2 * (self.n - self.window) && (i - self.window) % 2 == 1)
    }
}

impl UpdateStream for SlidingWindow {
    fn len(&self) -> usize {
        2 * self.n
    }

    fn update(&self, i: usize) -> Update {
        let key = self.key(i);
        Update {
            key: key as Key,
            point: self.data[self.perm[key]].clone(),
            is_insert: self.is_insert(i),
        }
    }
}
