/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Vectors of values of fixed bit width.

Elements are stored contiguously in 64-bit words, with no padding bits (in
particular, unless the bit width is a power of two some elements will be stored
across word boundaries).

The free functions [`read_bits`] and [`write_bits`] expose the underlying
access logic on raw word slices, so that structures storing fields of varying
width in the same array (e.g., the
[partitioned compact encoder](crate::mph::pthash::PartitionedCompactEncoder))
can share it.

*/

use mem_dbg::*;

/// A vector of bit fields of fixed width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, MemDbg, MemSize)]
pub struct BitFieldVec {
    /// The underlying storage.
    data: Vec<u64>,
    /// The bit width of the values stored in the vector.
    bit_width: usize,
    /// A mask with its lowest `bit_width` bits set to one.
    mask: u64,
    /// The length of the vector.
    len: usize,
}

macro_rules! panic_if_out_of_bounds {
    ($index: expr, $len: expr) => {
        if $index >= $len {
            panic!("Index out of bounds: {} >= {}", $index, $len)
        }
    };
}

macro_rules! panic_if_value {
    ($value: expr, $mask: expr, $bit_width: expr) => {
        if $value & $mask != $value {
            panic!("Value {} does not fit in {} bits", $value, $bit_width);
        }
    };
}

#[inline(always)]
fn mask(bit_width: usize) -> u64 {
    if bit_width == 0 {
        0
    } else {
        u64::MAX >> (64 - bit_width)
    }
}

/// Return the number of bits necessary to represent `value`.
///
/// Zero needs zero bits.
#[inline(always)]
pub fn bit_width_of(value: u64) -> usize {
    (u64::BITS - value.leading_zeros()) as usize
}

/// Read `bit_width` bits starting at bit position `pos` of `data`.
///
/// # Panics
///
/// Panics if the bits are not contained in `data`, unless `bit_width` is zero.
#[inline(always)]
pub fn read_bits(data: &[u64], pos: usize, bit_width: usize) -> u64 {
    debug_assert!(bit_width <= 64);
    if bit_width == 0 {
        return 0;
    }
    let word_index = pos / 64;
    let bit_index = pos % 64;
    let mask = mask(bit_width);
    if bit_index + bit_width <= 64 {
        (data[word_index] >> bit_index) & mask
    } else {
        ((data[word_index] >> bit_index) | (data[word_index + 1] << (64 - bit_index))) & mask
    }
}

/// Write the lowest `bit_width` bits of `value` starting at bit position
/// `pos` of `data`.
///
/// Bits of `value` above `bit_width` are ignored.
#[inline(always)]
pub fn write_bits(data: &mut [u64], pos: usize, bit_width: usize, value: u64) {
    debug_assert!(bit_width <= 64);
    if bit_width == 0 {
        return;
    }
    let word_index = pos / 64;
    let bit_index = pos % 64;
    let mask = mask(bit_width);
    let value = value & mask;
    data[word_index] = (data[word_index] & !(mask << bit_index)) | (value << bit_index);
    if bit_index + bit_width > 64 {
        let shift = 64 - bit_index;
        data[word_index + 1] = (data[word_index + 1] & !(mask >> shift)) | (value >> shift);
    }
}

impl BitFieldVec {
    /// Create a new zero-initialized vector of given bit width and length.
    pub fn new(bit_width: usize, len: usize) -> Self {
        assert!(bit_width <= 64, "Bit width {} is larger than 64", bit_width);
        // We need at least one word to handle the case of bit width zero.
        let n_of_words = Ord::max(1, (len * bit_width).div_ceil(64));
        Self {
            data: vec![0; n_of_words],
            bit_width,
            mask: mask(bit_width),
            len,
        }
    }

    /// Create an empty vector that doesn't need to reallocate for up to
    /// `capacity` elements.
    pub fn with_capacity(bit_width: usize, capacity: usize) -> Self {
        assert!(bit_width <= 64, "Bit width {} is larger than 64", bit_width);
        let n_of_words = Ord::max(1, (capacity * bit_width).div_ceil(64));
        let mut data = Vec::with_capacity(n_of_words);
        data.push(0);
        Self {
            data,
            bit_width,
            mask: mask(bit_width),
            len: 0,
        }
    }

    /// Create a new vector by copying a slice; the bit width will be the
    /// minimum width sufficient to hold all values in the slice.
    pub fn from_slice(values: &[u64]) -> Self {
        let max = values.iter().copied().max().unwrap_or(0);
        let mut result = Self::new(bit_width_of(max), values.len());
        for (i, &value) in values.iter().enumerate() {
            unsafe { result.set_unchecked(i, value) };
        }
        result
    }

    /// Return the bit width of the values inside this vector.
    #[inline(always)]
    pub fn bit_width(&self) -> usize {
        self.bit_width
    }

    /// Return the mask used to extract values from this vector.
    #[inline(always)]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the value at the specified index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[inline(always)]
    pub fn get(&self, index: usize) -> u64 {
        panic_if_out_of_bounds!(index, self.len);
        unsafe { self.get_unchecked(index) }
    }

    /// Return the value at the specified index.
    ///
    /// # Safety
    ///
    /// `index` must be in [0..[len](`BitFieldVec::len`)). No bounds checking is
    /// performed.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> u64 {
        if self.bit_width == 0 {
            return 0;
        }
        let pos = index * self.bit_width;
        let word_index = pos / 64;
        let bit_index = pos % 64;
        let data = self.data.as_slice();
        if bit_index + self.bit_width <= 64 {
            (data.get_unchecked(word_index) >> bit_index) & self.mask
        } else {
            ((data.get_unchecked(word_index) >> bit_index)
                | (data.get_unchecked(word_index + 1) << (64 - bit_index)))
                & self.mask
        }
    }

    /// Set the element of the vector at the specified index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds or the value does not fit in
    /// [`BitFieldVec::bit_width`] bits.
    #[inline(always)]
    pub fn set(&mut self, index: usize, value: u64) {
        panic_if_out_of_bounds!(index, self.len);
        panic_if_value!(value, self.mask, self.bit_width);
        unsafe { self.set_unchecked(index, value) }
    }

    /// # Safety
    ///
    /// `index` must be in [0..[len](`BitFieldVec::len`)) and `value` must fit
    /// in [`BitFieldVec::bit_width`] bits.
    #[inline(always)]
    pub unsafe fn set_unchecked(&mut self, index: usize, value: u64) {
        write_bits(&mut self.data, index * self.bit_width, self.bit_width, value);
    }

    /// Add a value at the end of the vector.
    pub fn push(&mut self, value: u64) {
        panic_if_value!(value, self.mask, self.bit_width);
        if (self.len + 1) * self.bit_width > self.data.len() * 64 {
            self.data.push(0);
        }
        unsafe { self.set_unchecked(self.len, value) };
        self.len += 1;
    }

    /// Return an iterator over the values.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        (0..self.len).map(move |i| unsafe { self.get_unchecked(i) })
    }

    /// Return the number of bits used by this structure: the storage words
    /// plus the bit width and the length.
    pub fn num_bits(&self) -> u64 {
        (self.data.len() as u64 + 2) * 64
    }
}

impl core::iter::Extend<u64> for BitFieldVec {
    fn extend<T: IntoIterator<Item = u64>>(&mut self, iter: T) {
        for value in iter {
            self.push(value);
        }
    }
}
