/*
 *
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! An implementation of the Elias–Fano representation of monotone sequences.
//!
//! Given a monotone sequence 0 ≤ *x*₀ ≤ *x*₁ ≤ ... ≤ *x*<sub>*n* – 1</sub> ≤
//! *u*, where *u* is a given upper bound, the Elias–Fano representation makes
//! it possible to store the sequence using at most 2 + lg(*u*/*n*) bits per
//! element, which is very close to the information-theoretical lower bound ≈ lg
//! *e* + lg(*u*/*n*) when *n* is much smaller than *u*.
//!
//! The elements of the sequence are recorded by storing separately the lower
//! *s* = ⌊lg(*u*/*n*)⌋ bits and the remaining upper bits. The lower bits are
//! stored contiguously, whereas the upper bits are stored in an array of *n* +
//! ⌊*u* / 2<sup>*s*</sup>⌋ + 1 bits by setting, for each 0 ≤ *i* < *n*, the bit
//! of index ⌊*x*<sub>*i*</sub> / 2<sup>*s*</sup>⌋ + *i*; the value can then be
//! recovered by selecting the *i*-th bit of the resulting bit array and
//! subtracting *i* (note that this will work because the upper bits are
//! nondecreasing).
//!
//! Selection uses a one-level inventory recording the position of a one every
//! 2<sup>[`LOG2_ONES_PER_INVENTORY`]</sup>, followed by a linear scan.
//!
//! In this crate Elias–Fano sequences store the remapping of out-of-range
//! positions to free slots and, through the
//! [`EliasFanoEncoder`](crate::mph::pthash::EliasFanoEncoder), prefix sums of
//! pilots.

use crate::bits::*;
use crate::utils::select_in_word;
use mem_dbg::*;

/// The base-2 logarithm of the number of ones between two inventory entries.
pub const LOG2_ONES_PER_INVENTORY: usize = 8;
const ONES_PER_INVENTORY_MASK: usize = (1 << LOG2_ONES_PER_INVENTORY) - 1;

/// A builder for [`EliasFano`].
///
/// After creating an instance, you can push values in nondecreasing order
/// with [`push`](EliasFanoBuilder::push) and then call
/// [`build`](EliasFanoBuilder::build).
///
/// # Examples
///
/// ```rust
/// use mphf::dict::EliasFanoBuilder;
///
/// let mut efb = EliasFanoBuilder::new(4, 10);
/// efb.push(0);
/// efb.push(2);
/// efb.push(8);
/// efb.push(10);
///
/// let ef = efb.build();
/// assert_eq!(ef.get(0), 0);
/// assert_eq!(ef.get(2), 8);
/// ```
#[derive(Debug, Clone)]
pub struct EliasFanoBuilder {
    n: usize,
    u: u64,
    l: usize,
    low_bits: BitFieldVec,
    high_bits: BitVec,
    last_value: u64,
    count: usize,
}

impl EliasFanoBuilder {
    /// Create a builder for an [`EliasFano`] containing
    /// `n` numbers smaller than or equal to `u`.
    pub fn new(n: usize, u: u64) -> Self {
        let l = if n > 0 && u >= n as u64 {
            (u / n as u64).ilog2() as usize
        } else {
            0
        };

        Self {
            n,
            u,
            l,
            low_bits: BitFieldVec::new(l, n),
            high_bits: BitVec::new(n + (u >> l) as usize + 1),
            last_value: 0,
            count: 0,
        }
    }

    /// Add a new value to the builder.
    ///
    /// # Panics
    ///
    /// Panics if the value is smaller than the last one, larger than the upper
    /// bound, or if more than `n` values are pushed.
    pub fn push(&mut self, value: u64) {
        if self.count == self.n {
            panic!("Too many values (the declared number was {})", self.n);
        }
        if value < self.last_value {
            panic!("The values provided are not monotone: {} < {}", value, self.last_value);
        }
        if value > self.u {
            panic!("Value too large: {} > {}", value, self.u);
        }
        let low_mask = self.low_bits.mask();
        self.low_bits.set(self.count, value & low_mask);
        self.high_bits
            .set((value >> self.l) as usize + self.count, true);
        self.count += 1;
        self.last_value = value;
    }

    /// Build the sequence, adding a selection inventory on the upper bits.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` values have been pushed.
    pub fn build(self) -> EliasFano {
        assert_eq!(
            self.count, self.n,
            "Wrong number of values ({} instead of {})",
            self.count, self.n
        );
        let inventory = self
            .high_bits
            .iter_ones()
            .step_by(1 << LOG2_ONES_PER_INVENTORY)
            .map(|pos| pos as u64)
            .collect::<Vec<_>>();

        EliasFano {
            n: self.n,
            u: self.u,
            l: self.l,
            low_bits: self.low_bits,
            high_bits: self.high_bits,
            inventory: inventory.into_boxed_slice(),
        }
    }
}

impl Extend<u64> for EliasFanoBuilder {
    fn extend<T: IntoIterator<Item = u64>>(&mut self, iter: T) {
        for value in iter {
            self.push(value);
        }
    }
}

/// A monotone sequence of integers stored using the Elias–Fano representation,
/// with constant-time random access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, MemDbg, MemSize)]
pub struct EliasFano {
    /// The number of values.
    n: usize,
    /// An upper bound to the values.
    u: u64,
    /// The number of lower bits.
    l: usize,
    /// The lower-bits array.
    low_bits: BitFieldVec,
    /// The higher-bits array.
    high_bits: BitVec,
    /// The position of every 2<sup>[`LOG2_ONES_PER_INVENTORY`]</sup>-th one of
    /// the higher-bits array.
    inventory: Box<[u64]>,
}

impl EliasFano {
    /// Build directly from a slice of nondecreasing values.
    ///
    /// The upper bound will be the last value.
    pub fn from_slice(values: &[u64]) -> Self {
        let mut efb = EliasFanoBuilder::new(values.len(), values.last().copied().unwrap_or(0));
        efb.extend(values.iter().copied());
        efb.build()
    }

    /// Estimate the size in bits of an instance.
    pub fn estimate_size(u: u64, n: usize) -> usize {
        2 * n + (n as f64 * (u as f64 / n as f64).log2().ceil().max(0.0)) as usize
    }

    /// Return the number of values in the sequence.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Return the upper bound provided at construction time.
    #[inline(always)]
    pub fn upper_bound(&self) -> u64 {
        self.u
    }

    /// Return the value of given index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[inline(always)]
    pub fn get(&self, index: usize) -> u64 {
        if index >= self.n {
            panic!("Index out of bounds: {} >= {}", index, self.n)
        }
        unsafe { self.get_unchecked(index) }
    }

    /// # Safety
    ///
    /// `index` must be in [0..[len](`EliasFano::len`)).
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> u64 {
        let high = (self.select_high(index) - index) as u64;
        (high << self.l) | self.low_bits.get_unchecked(index)
    }

    /// Return the position of the one of rank `rank` in the upper-bits array.
    #[inline(always)]
    fn select_high(&self, rank: usize) -> usize {
        let words = self.high_bits.as_words();
        let pos = self.inventory[rank >> LOG2_ONES_PER_INVENTORY] as usize;
        let mut residual = rank & ONES_PER_INVENTORY_MASK;
        let mut word_index = pos / 64;
        // Keep the one at `pos`, which has rank zero relative to the residual
        let mut word = words[word_index] & (u64::MAX << (pos % 64));
        loop {
            let ones = word.count_ones() as usize;
            if residual < ones {
                return word_index * 64 + select_in_word(word, residual);
            }
            residual -= ones;
            word_index += 1;
            word = words[word_index];
        }
    }

    /// Return an iterator over the values.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        (0..self.n).map(move |i| unsafe { self.get_unchecked(i) })
    }

    /// Return the number of bits used by this structure.
    pub fn num_bits(&self) -> u64 {
        self.low_bits.num_bits()
            + self.high_bits.num_bits()
            + (self.inventory.len() as u64 + 3) * 64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_elias_fano() {
        let mut rng = SmallRng::seed_from_u64(0);
        for (n, u) in [(10, 1000), (100, 1000), (100, 100), (1000, 100), (1000, 10), (5000, 1 << 40)] {
            let mut values = (0..n).map(|_| rng.random_range(0..=u)).collect::<Vec<u64>>();
            values.sort();

            let mut efb = EliasFanoBuilder::new(n, u);
            efb.extend(values.iter().copied());
            let ef = efb.build();

            assert_eq!(ef.len(), n);
            for (i, &value) in values.iter().enumerate() {
                assert_eq!(ef.get(i), value);
            }
            assert_eq!(ef.iter().collect::<Vec<_>>(), values);
        }
    }

    #[test]
    fn test_constant_sequence() {
        let values = vec![7_u64; 1000];
        let ef = EliasFano::from_slice(&values);
        assert!(ef.iter().all(|x| x == 7));
    }

    #[test]
    fn test_empty() {
        let ef = EliasFano::from_slice(&[]);
        assert!(ef.is_empty());
        assert!(ef.num_bits() > 0);
    }

    #[test]
    #[should_panic]
    fn test_not_monotone() {
        let mut efb = EliasFanoBuilder::new(2, 10);
        efb.push(5);
        efb.push(4);
    }
}
