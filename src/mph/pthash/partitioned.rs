/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::*;
use crate::traits::mph::Mphf;
use crate::utils::mix64;
use dsi_progress_logger::*;
use mem_dbg::*;
use rayon::prelude::*;

/// A PTHash minimal perfect hash function made of independent partitions.
///
/// Keys are assigned to partitions using a [mixed](mix64) version of their
/// signature, so that the choice of the partition is independent from the
/// choice of the bucket. Each partition is a [`PTHash`] built on its own
/// keys, and partitions are built in parallel by the
/// [`PTHashBuilder`]. The value of a key is the value returned by its
/// partition plus the number of keys in the previous partitions.
///
/// Instances of this structure are immutable; the generic parameter `E` is
/// the [`Encoder`] used for the pilots of each partition.
#[derive(Debug, Clone, MemDbg, MemSize)]
pub struct PartitionedPTHash<E = DictionaryEncoder> {
    seed: u64,
    num_keys: usize,
    partitioner: UniformBucketer,
    /// The number of keys in the partitions before each partition.
    offsets: Box<[usize]>,
    partitions: Vec<PTHash<E>>,
}

impl<E: Encoder> PartitionedPTHash<E> {
    /// Return the number of partitions.
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Return the partitions.
    pub fn partitions(&self) -> &[PTHash<E>] {
        &self.partitions
    }

    /// Build a function from the signatures of the keys.
    ///
    /// Partitions are built on the current rayon thread pool and are
    /// collected in order, so the result does not depend on scheduling.
    pub(crate) fn try_build_from_sigs(
        sigs: &[u64],
        config: &BuildConfig,
        seed: u64,
        pl: &mut (impl ProgressLog + Clone + Send + Sync),
    ) -> Result<Self, SolveError> {
        let num_partitions = config.num_partitions.max(1);
        let partitioner = UniformBucketer::new(num_partitions);

        pl.item_name("key");
        pl.expected_updates(Some(sigs.len()));
        pl.start(format!("Splitting keys into {} partitions...", num_partitions));
        let mut partition_sigs = vec![Vec::new(); num_partitions];
        for &sig in sigs {
            partition_sigs[partitioner.bucket(mix64(sig))].push(sig);
        }
        pl.done_with_count(sigs.len());

        let sizes = partition_sigs.iter().map(Vec::len);
        pl.info(format_args!(
            "Partition sizes: min {} max {} average {:.1}",
            sizes.clone().min().unwrap_or(0),
            sizes.max().unwrap_or(0),
            sigs.len() as f64 / num_partitions as f64
        ));

        let offsets = std::iter::once(0)
            .chain(partition_sigs.iter().scan(0, |offset, sigs| {
                *offset += sigs.len();
                Some(*offset)
            }))
            .take(num_partitions)
            .collect::<Box<[usize]>>();

        let partitions = partition_sigs
            .into_par_iter()
            .enumerate()
            .map_with(pl.clone(), |pl, (index, sigs)| {
                pl.info(format_args!(
                    "Building partition {}/{}...",
                    index + 1,
                    num_partitions
                ));
                PTHash::try_build_from_sigs(&sigs, config.c, config.alpha, seed, pl)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            seed,
            num_keys: sigs.len(),
            partitioner,
            offsets,
            partitions,
        })
    }
}

impl<E: Encoder> Mphf for PartitionedPTHash<E> {
    #[inline(always)]
    fn get_by_sig(&self, sig: u64) -> usize {
        let partition = self.partitioner.bucket(mix64(sig));
        let value = self.offsets[partition] + self.partitions[partition].get_by_sig(sig);
        // Only keys outside the set landing in an empty last partition can
        // go beyond the range
        value.min(self.num_keys.saturating_sub(1))
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
        // seed, number of keys
        2 * 64
            + self.partitioner.num_bits()
            + self.offsets.len() as u64 * 64
            + self.partitions.iter().map(Mphf::num_bits).sum::<u64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ToSig;

    #[test]
    fn test_offsets_and_sizes() -> Result<(), SolveError> {
        let sigs = (0..10_000_u64).map(|x| u64::to_sig(&x, 0)).collect::<Vec<_>>();
        let config = BuildConfig::default().num_threads(1).num_partitions(7);
        let mph = PartitionedPTHash::<CompactEncoder>::try_build_from_sigs(
            &sigs,
            &config,
            0,
            no_logging![],
        )?;
        assert_eq!(mph.num_partitions(), 7);
        assert_eq!(
            mph.partitions().iter().map(Mphf::len).sum::<usize>(),
            10_000
        );
        for (i, partition) in mph.partitions().iter().enumerate().skip(1) {
            assert_eq!(
                mph.offsets[i],
                mph.offsets[i - 1] + mph.partitions()[i - 1].len()
            );
            assert!(!partition.is_empty());
        }
        let mut seen = vec![false; 10_000];
        for &sig in &sigs {
            let value = mph.get_by_sig(sig);
            assert!(!seen[value]);
            seen[value] = true;
        }
        Ok(())
    }

    #[test]
    fn test_more_partitions_than_keys() -> Result<(), SolveError> {
        let sigs = [u64::to_sig(&1, 0), u64::to_sig(&2, 0)];
        let config = BuildConfig::default().num_partitions(16);
        let mph = PartitionedPTHash::<DictionaryEncoder>::try_build_from_sigs(
            &sigs,
            &config,
            0,
            no_logging![],
        )?;
        let mut values = sigs.iter().map(|&sig| mph.get_by_sig(sig)).collect::<Vec<_>>();
        values.sort();
        assert_eq!(values, vec![0, 1]);
        for x in 0..1000 {
            assert!(mph.get(&x) < 2);
        }
        Ok(())
    }
}
