/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! PTHash minimal perfect hash functions.
//!
//! Keys are hashed to 64-bit [signatures](crate::utils::ToSig) and
//! distributed into buckets by a [`SkewedBucketer`]. For each bucket, a
//! *pilot* is searched so that the signatures of the bucket, combined with the
//! hash of the pilot, land in free positions of a table of ⌈*n* / α⌉ slots.
//! When α < 1, positions beyond *n* are remapped to the free slots below *n*
//! using an [Elias–Fano](crate::dict::EliasFano) sequence. The pilots are
//! stored using an [`Encoder`].
//!
//! There are two structures: [`PTHash`], a single monolithic function, and
//! [`PartitionedPTHash`], which splits the keys into partitions that are
//! built independently (and in parallel). Both are built by a
//! [`PTHashBuilder`].
//!
//! # Reference:
//! - [Giulio Ermanno Pibiri and Roberto Trani, PTHash: Revisiting FCH Minimal
//!   Perfect Hashing](https://doi.org/10.1145/3404835.3462849)

mod bucketer;
pub use bucketer::*;

mod builder;
pub use builder::*;

mod encoders;
pub use encoders::*;

mod partitioned;
pub use partitioned::*;

mod search;

use crate::dict::{EliasFano, EliasFanoBuilder};
use crate::traits::mph::Mphf;
use dsi_progress_logger::ProgressLog;
use mem_dbg::*;
use rdst::RadixSort;
use search::{hash_pilot, position, BucketSig};
use std::time::Instant;

/// A PTHash minimal perfect hash function.
///
/// Instances of this structure are immutable; they are built using a
/// [`PTHashBuilder`]. The generic parameter `E` is the [`Encoder`] used for
/// the pilots.
///
/// # Examples
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use mphf::prelude::*;
///
/// let keys = ["alpha", "beta", "gamma", "delta"];
/// let builder = PTHashBuilder::<PTHash<CompactEncoder>>::new(5.0, 0.99, 1, 0)?;
/// let mph = builder.build(&keys, 0, false)?;
///
/// let mut values = keys.iter().map(|key| mph.get(key)).collect::<Vec<_>>();
/// values.sort();
/// assert_eq!(values, vec![0, 1, 2, 3]);
/// #     Ok(())
/// # }
/// ```
#[derive(Debug, Clone, MemDbg, MemSize)]
pub struct PTHash<E = DictionaryEncoder> {
    seed: u64,
    num_keys: usize,
    table_size: u64,
    bucketer: SkewedBucketer,
    pilots: E,
    /// The free slot of position `num_keys + i` is at index `i`.
    free_slots: EliasFano,
}

impl<E: Encoder> PTHash<E> {
    /// Return the number of slots of the intermediate table.
    pub fn table_size(&self) -> u64 {
        self.table_size
    }

    /// Return the number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.bucketer.num_buckets()
    }

    /// Return the pilots.
    pub fn pilots(&self) -> &E {
        &self.pilots
    }

    /// Build a function from the signatures of the keys.
    ///
    /// Signatures must have been computed using `seed`. The same `seed` is
    /// used to hash pilots.
    pub(crate) fn try_build_from_sigs(
        sigs: &[u64],
        c: f64,
        alpha: f64,
        seed: u64,
        pl: &mut impl ProgressLog,
    ) -> Result<Self, SolveError> {
        let start = Instant::now();
        let num_keys = sigs.len();
        let num_buckets = num_buckets(num_keys, c);
        let table_size = table_size(num_keys, alpha);
        let bucketer = SkewedBucketer::new(num_buckets);

        pl.info(format_args!(
            "Number of keys: {} Number of buckets: {} Table size: {}",
            num_keys, num_buckets, table_size
        ));

        let mut pairs = sigs
            .iter()
            .map(|&sig| BucketSig {
                bucket: bucketer.bucket(sig) as u64,
                sig,
            })
            .collect::<Vec<_>>();
        // Sorting the signatures groups buckets together
        pairs.radix_sort_unstable();

        let (pilots, taken) = search::search(&pairs, num_buckets, table_size, seed, pl)?;
        drop(pairs);

        let free_slots = free_slots(num_keys, table_size, &taken);
        let pilots = E::encode(&pilots);

        let result = Self {
            seed,
            num_keys,
            table_size,
            bucketer,
            pilots,
            free_slots,
        };

        pl.info(format_args!(
            "Construction completed in {:.3} seconds ({} keys, {:.3} bits/key)",
            start.elapsed().as_secs_f64(),
            num_keys,
            result.bits_per_key()
        ));

        Ok(result)
    }
}

impl<E: Encoder> Mphf for PTHash<E> {
    #[inline(always)]
    fn get_by_sig(&self, sig: u64) -> usize {
        let bucket = self.bucketer.bucket(sig);
        let pilot = self.pilots.get(bucket);
        let pos = position(sig, hash_pilot(pilot, self.seed), self.table_size);
        if pos < self.num_keys as u64 {
            pos as usize
        } else {
            self.free_slots.get((pos - self.num_keys as u64) as usize) as usize
        }
    }

    #[inline(always)]
    fn seed(&self) -> u64 {
        self.seed
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.num_keys
    }

    fn num_bits(&self) -> u64 {
        // seed, number of keys, table size
        3 * 64 + self.bucketer.num_bits() + self.pilots.num_bits() + self.free_slots.num_bits()
    }
}

/// The number of buckets, ⌈*cn* / lg *n*⌉.
fn num_buckets(num_keys: usize, c: f64) -> usize {
    let n = num_keys as f64;
    ((c * n) / n.log2().max(1.0)).ceil().max(1.0) as usize
}

/// The size of the intermediate table, ⌈*n* / α⌉, and at least one.
fn table_size(num_keys: usize, alpha: f64) -> u64 {
    let size = (num_keys as f64 / alpha).ceil() as u64;
    size.max(num_keys as u64).max(1)
}

/// Compute the remapping of taken positions in [`num_keys`..`table_size`) to
/// the free positions in [0..`num_keys`).
///
/// Positions that are not taken repeat the previous value, so that the
/// sequence is monotone and any position is mapped in range.
fn free_slots(num_keys: usize, table_size: u64, taken: &crate::bits::BitVec) -> EliasFano {
    let num_positions = table_size as usize - num_keys;
    let mut efb = EliasFanoBuilder::new(num_positions, num_keys as u64);
    let mut next_free = 0;
    let mut last = 0;
    for pos in num_keys..table_size as usize {
        if taken[pos] {
            while taken[next_free] {
                next_free += 1;
            }
            last = next_free as u64;
            next_free += 1;
        }
        efb.push(last);
    }
    efb.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVec;

    #[test]
    fn test_parameters() {
        assert_eq!(num_buckets(0, 4.5), 1);
        assert_eq!(num_buckets(1, 4.5), 5);
        assert_eq!(num_buckets(26, 1.5), 9);
        assert_eq!(table_size(0, 0.5), 1);
        assert_eq!(table_size(26, 0.94), 28);
        assert_eq!(table_size(100, 1.0), 100);
    }

    #[test]
    fn test_free_slots() {
        // Keys 0..6, table of 10: positions 0, 2 and 5 are free and
        // positions 6, 8 and 9 are taken.
        let mut taken = BitVec::new(10);
        for pos in [1, 3, 4, 6, 8, 9] {
            taken.set(pos, true);
        }
        let free = free_slots(6, 10, &taken);
        assert_eq!(free.iter().collect::<Vec<_>>(), vec![0, 0, 2, 5]);
    }
}
