/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Traits for minimal perfect hash functions.
//!
//! A minimal perfect hash function maps a fixed set of *n* keys bijectively
//! onto [0..*n*). Keys outside the set are mapped to unspecified values in the
//! same range: no membership test is performed.

use crate::utils::ToSig;

/// The query interface of a minimal perfect hash function.
///
/// Implementors need only provide lookup by [signature](ToSig): the
/// signature of a key is computed using the [seed](Mphf::seed) of the
/// structure.
pub trait Mphf {
    /// Return the value associated with a signature.
    ///
    /// The signature must have been computed with [`Mphf::seed`].
    fn get_by_sig(&self, sig: u64) -> usize;

    /// Return the seed used to compute signatures.
    fn seed(&self) -> u64;

    /// Return the number of keys.
    fn len(&self) -> usize;

    /// Return the number of bits used by this structure.
    fn num_bits(&self) -> u64;

    /// Return whether the key set was empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the value associated with a key.
    ///
    /// If the key was in the construction set, the result is its unique index
    /// in [0..[len](Mphf::len)); otherwise, the result is an arbitrary index
    /// in the same range.
    #[inline(always)]
    fn get<K: ToSig + ?Sized>(&self, key: &K) -> usize {
        self.get_by_sig(K::to_sig(key, self.seed()))
    }

    /// Return the number of bits per key used by this structure.
    fn bits_per_key(&self) -> f64 {
        self.num_bits() as f64 / self.len().max(1) as f64
    }
}
