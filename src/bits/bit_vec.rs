/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

A plain bit vector on 64-bit words.

It is used as the *taken* map during pilot search and as the upper-bits
array of [Elias–Fano](crate::dict::elias_fano::EliasFano) sequences.

 */
use mem_dbg::*;
use rayon::prelude::*;
use std::ops::Index;

/// A bit vector backed by a `Vec<u64>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, MemDbg, MemSize)]
pub struct BitVec {
    data: Vec<u64>,
    len: usize,
}

macro_rules! panic_if_out_of_bounds {
    ($index: expr, $len: expr) => {
        if $index >= $len {
            panic!("Bit index out of bounds: {} >= {}", $index, $len)
        }
    };
}

impl Index<usize> for BitVec {
    type Output = bool;

    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            false => &false,
            true => &true,
        }
    }
}

impl BitVec {
    /// Create a new zeroed bit vector of length `len`.
    pub fn new(len: usize) -> Self {
        let n_of_words = len.div_ceil(64);
        Self {
            data: vec![0; n_of_words],
            len,
        }
    }

    /// Return the number of bits in this bit vector.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the bit of given index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not smaller than the length.
    #[inline(always)]
    pub fn get(&self, index: usize) -> bool {
        panic_if_out_of_bounds!(index, self.len);
        unsafe { self.get_unchecked(index) }
    }

    /// # Safety
    /// `index` must be in [0..[len](`BitVec::len`)). No bounds checking is performed.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> bool {
        let word = *self.data.get_unchecked(index / 64);
        (word >> (index % 64)) & 1 != 0
    }

    /// Set the bit of given index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not smaller than the length.
    #[inline(always)]
    pub fn set(&mut self, index: usize, value: bool) {
        panic_if_out_of_bounds!(index, self.len);
        let word = &mut self.data[index / 64];
        let bit = index % 64;
        *word &= !(1 << bit);
        *word |= (value as u64) << bit;
    }

    /// Return the number of bits set to one.
    pub fn count_ones(&self) -> usize {
        self.data.par_iter().map(|x| x.count_ones() as usize).sum()
    }

    /// Return the underlying words.
    ///
    /// Bits beyond the length are guaranteed to be zero.
    #[inline(always)]
    pub fn as_words(&self) -> &[u64] {
        &self.data
    }

    /// Return the number of bits used by this structure, including the
    /// length field.
    pub fn num_bits(&self) -> u64 {
        (self.data.len() as u64 + 1) * 64
    }

    /// Return an iterator over the positions of the ones.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.data.iter().enumerate().flat_map(|(i, &word)| {
            let mut word = word;
            std::iter::from_fn(move || {
                if word == 0 {
                    None
                } else {
                    let bit = word.trailing_zeros() as usize;
                    word &= word - 1;
                    Some(i * 64 + bit)
                }
            })
        })
    }
}
