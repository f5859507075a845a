//! Weighted range-sum index over node occurrence counters.
//!
//! A bottom-up segment tree stored in a flat array of `2n + 1` slots. Leaf
//! `i` lives at slot `n + i`; every internal slot `p` holds the sum of slots
//! `2p` and `2p + 1`. The leaf counter of a node is the number of completed
//! messages it was the source or destination of.
//!
//! The index knows nothing about tree shape. Subtree weights are obtained by
//! [`crate::Tree::weight`], which turns a node into its id range first.

/// Segment tree of occurrence counters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightTree {
    slots: Vec<u64>,
    size: usize,
}

impl WeightTree {
    /// Create an index over `size` leaves, all zero.
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![0; size * 2 + 1],
            size,
        }
    }

    /// Number of leaves.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// True when the index covers no leaves.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Raw counter of a leaf.
    #[inline]
    pub fn occurrences(&self, leaf: usize) -> u64 {
        self.slots[leaf + self.size]
    }

    /// Sum of every leaf counter.
    pub fn total(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.range_sum(0, self.size - 1)
    }

    /// Increment a leaf counter and refresh its ancestors. O(log n).
    pub fn increment(&mut self, leaf: usize) {
        debug_assert!(leaf < self.size, "leaf {} out of range", leaf);

        let mut pos = leaf + self.size;
        self.slots[pos] += 1;

        pos /= 2;
        while pos > 0 {
            self.slots[pos] = self.slots[pos * 2] + self.slots[pos * 2 + 1];
            pos /= 2;
        }
    }

    /// Sum of leaf counters over the inclusive range `[min, max]`. O(log n).
    ///
    /// Callers must pass `min <= max`; an absent subtree has weight zero and
    /// is handled before reaching the index.
    pub fn range_sum(&self, min: usize, max: usize) -> u64 {
        debug_assert!(min <= max, "empty range [{}, {}]", min, max);
        debug_assert!(max < self.size, "range end {} out of range", max);

        let mut sum = 0;
        let mut a = min + self.size;
        let mut b = max + self.size;

        while a <= b {
            if a % 2 == 1 {
                sum += self.slots[a];
                a += 1;
            }
            if b % 2 == 0 {
                sum += self.slots[b];
                // b is even and at least 2 here, so this never underflows
                b -= 1;
            }
            a /= 2;
            b /= 2;
        }

        sum
    }
}
