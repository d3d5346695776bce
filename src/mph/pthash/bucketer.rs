/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Functions mapping signatures to buckets.

use crate::utils::fast_range;
use mem_dbg::*;

/// A map from signatures to [0..[num_buckets](Bucketer::num_buckets)).
pub trait Bucketer {
    fn new(num_buckets: usize) -> Self;
    fn bucket(&self, sig: u64) -> usize;
    fn num_buckets(&self) -> usize;
    /// Return the number of bits used by this structure.
    fn num_bits(&self) -> u64;
}

/// Maps signatures uniformly to buckets.
///
/// Used to select partitions, after [mixing](crate::utils::mix64) the
/// signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, MemDbg, MemSize)]
pub struct UniformBucketer {
    n: u64,
}

impl Bucketer for UniformBucketer {
    #[inline(always)]
    fn new(num_buckets: usize) -> Self {
        Self {
            n: num_buckets as u64,
        }
    }

    #[inline(always)]
    fn bucket(&self, sig: u64) -> usize {
        fast_range(sig, self.n) as usize
    }

    #[inline(always)]
    fn num_buckets(&self) -> usize {
        self.n as usize
    }

    fn num_bits(&self) -> u64 {
        64
    }
}

/// Maps 60% of the signatures to 30% of the buckets (the *dense* buckets),
/// and the remaining signatures to the remaining buckets.
///
/// Skewing bucket sizes this way makes the search for the large buckets, which
/// are processed first, easier, and reduces the average pilot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, MemDbg, MemSize)]
pub struct SkewedBucketer {
    num_dense_buckets: u64,
    num_sparse_buckets: u64,
}

impl SkewedBucketer {
    /// Signatures below this threshold (60% of the range) go to dense buckets.
    const DENSE_THRESHOLD: u64 = u64::MAX / 5 * 3;
}

impl Bucketer for SkewedBucketer {
    #[inline(always)]
    fn new(num_buckets: usize) -> Self {
        let num_buckets = num_buckets as u64;
        let num_dense_buckets = (num_buckets * 3) / 10;
        Self {
            num_dense_buckets,
            num_sparse_buckets: num_buckets - num_dense_buckets,
        }
    }

    /// The high bits of a signature select the dense or sparse range, so
    /// the bucket inside the range is given by the remainder.
    #[inline(always)]
    fn bucket(&self, sig: u64) -> usize {
        // With fewer than four buckets there are no dense buckets
        if sig < Self::DENSE_THRESHOLD && self.num_dense_buckets != 0 {
            (sig % self.num_dense_buckets) as usize
        } else {
            (self.num_dense_buckets + sig % self.num_sparse_buckets) as usize
        }
    }

    #[inline(always)]
    fn num_buckets(&self) -> usize {
        (self.num_dense_buckets + self.num_sparse_buckets) as usize
    }

    fn num_bits(&self) -> u64 {
        128
    }
}
