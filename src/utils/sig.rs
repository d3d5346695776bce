/*
 *
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Key signatures.
//!
//! A *signature* is a random-looking 64-bit hash of a key, computed with a
//! seed. All construction and lookup logic works on signatures: the keys
//! themselves are never stored.
//!
//! The trait [`ToSig`] provides a standard way to generate signatures.

use xxhash_rust::xxh3;

/// Trait for types that must be turned into a signature.
///
/// We provide implementations for all primitive types, `str`, `String`,
/// `[u8]`, `Vec<u8>`, and references to any implementing type, by turning
/// them into bytes and calling [`xxh3::xxh3_64_with_seed`].
///
/// Note that for efficiency reasons the implementations on primitive types
/// are not endianness-independent.
pub trait ToSig {
    fn to_sig(key: &Self, seed: u64) -> u64;
}

impl ToSig for str {
    #[inline(always)]
    fn to_sig(key: &Self, seed: u64) -> u64 {
        xxh3::xxh3_64_with_seed(key.as_bytes(), seed)
    }
}

impl ToSig for String {
    #[inline(always)]
    fn to_sig(key: &Self, seed: u64) -> u64 {
        xxh3::xxh3_64_with_seed(key.as_bytes(), seed)
    }
}

impl ToSig for [u8] {
    #[inline(always)]
    fn to_sig(key: &Self, seed: u64) -> u64 {
        xxh3::xxh3_64_with_seed(key, seed)
    }
}

impl ToSig for Vec<u8> {
    #[inline(always)]
    fn to_sig(key: &Self, seed: u64) -> u64 {
        xxh3::xxh3_64_with_seed(key, seed)
    }
}

impl<T: ToSig + ?Sized> ToSig for &T {
    #[inline(always)]
    fn to_sig(key: &Self, seed: u64) -> u64 {
        T::to_sig(*key, seed)
    }
}

macro_rules! to_sig_prim {
    ($($ty:ty),*) => {$(
        impl ToSig for $ty {
            #[inline(always)]
            fn to_sig(key: &Self, seed: u64) -> u64 {
                xxh3::xxh3_64_with_seed(&key.to_ne_bytes(), seed)
            }
        }
    )*};
}

to_sig_prim!(isize, usize, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128);

/// Fully mixes the bits of a 64-bit value (the MurmurHash3 finalizer).
///
/// Used to derive from a signature a value that is independent from the bits
/// used for bucketing.
#[inline(always)]
pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51afd7ed558ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ceb9fe1a85ec53);
    x ^= x >> 33;
    x
}

/// Map `x` uniformly into [0..`n`) using the high bits of the product.
///
/// See Daniel Lemire, “[A fast alternative to the modulo
/// reduction](https://lemire.me/blog/2016/06/27/a-fast-alternative-to-the-modulo-reduction/)”.
#[inline(always)]
pub fn fast_range(x: u64, n: u64) -> u64 {
    ((x as u128 * n as u128) >> 64) as u64
}
