/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Pilot search.
//!
//! Buckets are processed by decreasing size. For each bucket we look for the
//! smallest *pilot* such that all signatures of the bucket, XOR'd with the
//! hash of the pilot and mapped to the table, land in distinct
//! positions that have not been taken by the buckets processed before.

use super::SolveError;
use crate::bits::BitVec;
use crate::utils::{fast_range, mix64};
use dsi_progress_logger::ProgressLog;
use rdst::RadixKey;
use std::cmp::Reverse;
use xxhash_rust::xxh3;

/// The number of pilots whose hash is precomputed.
const SEARCH_CACHE_SIZE: usize = 256;

/// A signature together with its bucket.
///
/// Sorting by (bucket, signature) groups buckets together and makes duplicate
/// signatures adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct BucketSig {
    pub bucket: u64,
    pub sig: u64,
}

impl RadixKey for BucketSig {
    const LEVELS: usize = 16;

    #[inline(always)]
    fn get_level(&self, level: usize) -> u8 {
        if level < 8 {
            (self.sig >> (level * 8)) as u8
        } else {
            (self.bucket >> ((level - 8) * 8)) as u8
        }
    }
}

/// Hash a pilot.
#[inline(always)]
pub(crate) fn hash_pilot(pilot: u64, seed: u64) -> u64 {
    xxh3::xxh3_64_with_seed(&pilot.to_le_bytes(), seed)
}

/// Return the position in the table of a signature given the hash of the
/// pilot of its bucket.
///
/// The XOR is [mixed](mix64) before reduction, so that all bits of the
/// signature affect the position whatever the table size (with a plain
/// remainder modulo 2<sup>*k*</sup>, signatures with the same lowest *k* bits would
/// always collide).
#[inline(always)]
pub(crate) fn position(sig: u64, hashed_pilot: u64, table_size: u64) -> u64 {
    fast_range(mix64(sig ^ hashed_pilot), table_size)
}

/// The maximum number of pilots tried for a bucket before giving up.
///
/// The PTHash search as published is unbounded; here a bucket that cannot be
/// placed within the budget makes the construction fail with
/// [`SolveError::UnsolvableBucket`], and the caller can try another seed.
/// The last buckets to be placed are singletons looking for one of the few
/// remaining free positions, so the expected number of attempts grows with
/// the table size.
pub(crate) fn pilot_budget(table_size: u64) -> u64 {
    table_size.saturating_mul(64).max(1 << 16)
}

/// Pilot hashes with a cache for the smallest pilots.
pub(crate) struct PilotHasher {
    seed: u64,
    cache: [u64; SEARCH_CACHE_SIZE],
}

impl PilotHasher {
    pub fn new(seed: u64) -> Self {
        let mut cache = [0; SEARCH_CACHE_SIZE];
        for (pilot, hash) in cache.iter_mut().enumerate() {
            *hash = hash_pilot(pilot as u64, seed);
        }
        Self { seed, cache }
    }

    #[inline(always)]
    pub fn hash(&self, pilot: u64) -> u64 {
        if pilot < SEARCH_CACHE_SIZE as u64 {
            self.cache[pilot as usize]
        } else {
            hash_pilot(pilot, self.seed)
        }
    }
}

/// Search pilots for all buckets.
///
/// `pairs` must be sorted by (bucket, signature). Returns the pilots, indexed
/// by bucket, and the bit vector of taken positions.
///
/// Differently from the published PTHash search, the number of pilots tried
/// for each bucket is capped by [`pilot_budget`].
pub(crate) fn search(
    pairs: &[BucketSig],
    num_buckets: usize,
    table_size: u64,
    seed: u64,
    pl: &mut impl ProgressLog,
) -> Result<(Vec<u64>, BitVec), SolveError> {
    if pairs.windows(2).any(|w| w[0] == w[1]) {
        return Err(SolveError::DuplicateSignature);
    }

    // (size, bucket, start) for each nonempty bucket
    let mut buckets = Vec::new();
    let mut start = 0;
    while start < pairs.len() {
        let bucket = pairs[start].bucket;
        let end = start + pairs[start..].partition_point(|p| p.bucket == bucket);
        buckets.push((end - start, bucket as usize, start));
        start = end;
    }
    buckets.sort_unstable_by_key(|&(size, bucket, _)| (Reverse(size), bucket));

    let max_bucket_size = buckets.first().map_or(0, |&(size, _, _)| size);
    pl.info(format_args!(
        "Nonempty buckets: {} Max bucket size: {}",
        buckets.len(),
        max_bucket_size
    ));

    let hasher = PilotHasher::new(seed);
    let budget = pilot_budget(table_size);
    let mut pilots = vec![0; num_buckets];
    let mut taken = BitVec::new(table_size as usize);
    let mut positions = Vec::with_capacity(max_bucket_size);

    pl.item_name("bucket");
    pl.expected_updates(Some(buckets.len()));
    pl.start("Searching pilots...");

    for &(size, bucket, start) in &buckets {
        let sigs = pairs[start..start + size].iter().map(|p| p.sig);
        let mut found = false;
        'pilots: for pilot in 0..budget {
            let hashed_pilot = hasher.hash(pilot);
            positions.clear();
            for sig in sigs.clone() {
                let pos = position(sig, hashed_pilot, table_size) as usize;
                if taken[pos] {
                    continue 'pilots;
                }
                positions.push(pos);
            }
            positions.sort_unstable();
            if positions.windows(2).any(|w| w[0] == w[1]) {
                continue;
            }
            for &pos in &positions {
                taken.set(pos, true);
            }
            pilots[bucket] = pilot;
            found = true;
            break;
        }

        if !found {
            pl.done();
            return Err(SolveError::UnsolvableBucket {
                bucket,
                attempts: budget,
            });
        }
        pl.light_update();
    }

    pl.done();
    Ok((pilots, taken))
}
