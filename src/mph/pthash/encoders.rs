/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Encoders for pilot tables.
//!
//! An [`Encoder`] stores a sequence of unsigned integers in a compact bit
//! layout and provides random access to it. Different encoders trade
//! construction time, query time, and final size: pilots are small on
//! average, but their distribution depends on the bucket (dense buckets,
//! which are processed first, have smaller pilots).

use crate::bits::*;
use crate::dict::EliasFano;
use itertools::Itertools;
use mem_dbg::*;

/// A strategy for storing a sequence of pilots.
pub trait Encoder: MemDbg + MemSize + Send + Sync + Sized {
    /// A short name for the encoder, used in descriptive names.
    fn name() -> &'static str;

    /// Encode a sequence of values.
    fn encode(values: &[u64]) -> Self;

    /// Return the value of given index.
    ///
    /// # Panics
    ///
    /// May panic if the index is out of bounds.
    fn get(&self, index: usize) -> u64;

    /// Return the number of values.
    fn len(&self) -> usize;

    /// Return the number of bits used by the encoded sequence.
    fn num_bits(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the whole sequence.
    fn decode(&self) -> Vec<u64> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}

/// Stores all values using the bit width of the largest one.
#[derive(Debug, Clone, MemDbg, MemSize)]
pub struct CompactEncoder {
    values: BitFieldVec,
}

impl Encoder for CompactEncoder {
    fn name() -> &'static str {
        "compact"
    }

    fn encode(values: &[u64]) -> Self {
        Self {
            values: BitFieldVec::from_slice(values),
        }
    }

    #[inline(always)]
    fn get(&self, index: usize) -> u64 {
        self.values.get(index)
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn num_bits(&self) -> u64 {
        self.values.num_bits()
    }
}

/// The base-2 logarithm of the number of values in a block of a
/// [`PartitionedCompactEncoder`].
const LOG2_BLOCK_SIZE: usize = 8;

/// Splits the values in blocks of 256 and stores each block with the bit
/// width of its largest value.
///
/// Since pilots of dense and sparse buckets have different distributions, this
/// encoder adapts to local maxima instead of paying everywhere for the global
/// maximum.
#[derive(Debug, Clone, MemDbg, MemSize)]
pub struct PartitionedCompactEncoder {
    /// The number of values.
    len: usize,
    /// The concatenated blocks.
    data: Box<[u64]>,
    /// For each block, the bit offset of the block in `data`, plus a final
    /// sentinel containing the total number of bits.
    offsets: BitFieldVec,
    /// For each block, its bit width.
    bit_widths: Box<[u8]>,
}

impl Encoder for PartitionedCompactEncoder {
    fn name() -> &'static str {
        "partitioned_compact"
    }

    fn encode(values: &[u64]) -> Self {
        let blocks = values.chunks(1 << LOG2_BLOCK_SIZE);
        let bit_widths = blocks
            .clone()
            .map(|block| bit_width_of(block.iter().copied().max().unwrap_or(0)) as u8)
            .collect::<Box<[u8]>>();

        let mut offsets = Vec::with_capacity(bit_widths.len() + 1);
        let mut total_bits = 0;
        offsets.push(0);
        for (block, &bit_width) in blocks.clone().zip(bit_widths.iter()) {
            total_bits += block.len() as u64 * bit_width as u64;
            offsets.push(total_bits);
        }

        // One more word so that reads never cross the end of the array
        let mut data = vec![0; total_bits.div_ceil(64) as usize + 1];
        for (block, (&bit_width, &offset)) in blocks.zip(bit_widths.iter().zip(offsets.iter())) {
            let bit_width = bit_width as usize;
            for (i, &value) in block.iter().enumerate() {
                write_bits(&mut data, offset as usize + i * bit_width, bit_width, value);
            }
        }

        Self {
            len: values.len(),
            data: data.into_boxed_slice(),
            offsets: BitFieldVec::from_slice(&offsets),
            bit_widths,
        }
    }

    #[inline(always)]
    fn get(&self, index: usize) -> u64 {
        if index >= self.len {
            panic!("Index out of bounds: {} >= {}", index, self.len)
        }
        let block = index >> LOG2_BLOCK_SIZE;
        let bit_width = self.bit_widths[block] as usize;
        let offset = self.offsets.get(block) as usize;
        let pos = offset + (index & ((1 << LOG2_BLOCK_SIZE) - 1)) * bit_width;
        read_bits(&self.data, pos, bit_width)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn num_bits(&self) -> u64 {
        (self.data.len() as u64 + 1) * 64 + self.offsets.num_bits() + self.bit_widths.len() as u64 * 8
    }
}

/// Stores the distinct values in a dictionary, and for each value its rank in
/// the dictionary.
///
/// Distinct values are sorted by decreasing frequency, so that the most
/// frequent ones have the smallest ranks. Since pilots are heavily skewed
/// towards small values, the number of distinct values is small, and ranks
/// need few bits.
#[derive(Debug, Clone, MemDbg, MemSize)]
pub struct DictionaryEncoder {
    ranks: BitFieldVec,
    dict: BitFieldVec,
}

impl Encoder for DictionaryEncoder {
    fn name() -> &'static str {
        "dictionary"
    }

    fn encode(values: &[u64]) -> Self {
        // Ties are broken by value so that the layout is deterministic
        let distinct = values
            .iter()
            .copied()
            .counts()
            .into_iter()
            .sorted_unstable_by_key(|&(value, count)| (std::cmp::Reverse(count), value))
            .map(|(value, _)| value)
            .collect::<Vec<_>>();

        let rank_of = distinct
            .iter()
            .enumerate()
            .map(|(rank, &value)| (value, rank as u64))
            .collect::<std::collections::HashMap<_, _>>();

        let mut ranks = BitFieldVec::new(bit_width_of(distinct.len().saturating_sub(1) as u64), values.len());
        for (i, value) in values.iter().enumerate() {
            ranks.set(i, rank_of[value]);
        }

        Self {
            ranks,
            dict: BitFieldVec::from_slice(&distinct),
        }
    }

    #[inline(always)]
    fn get(&self, index: usize) -> u64 {
        let rank = self.ranks.get(index);
        // Ranks are always smaller than the dictionary length
        unsafe { self.dict.get_unchecked(rank as usize) }
    }

    fn len(&self) -> usize {
        self.ranks.len()
    }

    fn num_bits(&self) -> u64 {
        self.ranks.num_bits() + self.dict.num_bits()
    }
}

/// Stores the prefix sums of the values using the
/// [Elias–Fano representation](EliasFano).
///
/// Access requires two selections, so this encoder is the slowest, but the
/// space is close to the sum of the logarithms of the average value.
#[derive(Debug, Clone, MemDbg, MemSize)]
pub struct EliasFanoEncoder {
    prefix_sums: EliasFano,
}

impl Encoder for EliasFanoEncoder {
    fn name() -> &'static str {
        "elias_fano"
    }

    fn encode(values: &[u64]) -> Self {
        let prefix_sums = std::iter::once(0)
            .chain(values.iter().scan(0_u64, |sum, &value| {
                *sum += value;
                Some(*sum)
            }))
            .collect::<Vec<_>>();
        Self {
            prefix_sums: EliasFano::from_slice(&prefix_sums),
        }
    }

    #[inline(always)]
    fn get(&self, index: usize) -> u64 {
        self.prefix_sums.get(index + 1) - self.prefix_sums.get(index)
    }

    fn len(&self) -> usize {
        self.prefix_sums.len() - 1
    }

    fn num_bits(&self) -> u64 {
        self.prefix_sums.num_bits()
    }
}
