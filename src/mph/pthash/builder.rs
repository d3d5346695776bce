/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::*;
use crate::traits::mph::Mphf;
use crate::utils::ToSig;
use derivative::Derivative;
use derive_setters::*;
use dsi_progress_logger::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::marker::PhantomData;

/// The smallest admissible value of [`BuildConfig::c`].
///
/// Below this value the probability that the pilot search succeeds is too
/// low.
pub const MIN_C: f64 = 1.45;

/// The parameters of a construction.
///
/// ```rust
/// use mphf::prelude::*;
///
/// let config = BuildConfig::default().c(5.0).alpha(0.99).num_threads(4);
/// assert_eq!(config.num_partitions, 0);
/// ```
#[derive(Setters, Debug, Clone, Copy, PartialEq, Derivative)]
#[derivative(Default)]
pub struct BuildConfig {
    /// The ratio between the number of buckets and *n* / lg *n*. Larger
    /// values make the construction faster and the structure larger. Must be
    /// at least [`MIN_C`]. The default is 4.5.
    #[derivative(Default(value = "4.5"))]
    pub c: f64,

    /// The load factor of the intermediate table, in (0..1]. Smaller values
    /// make the construction faster, but require the remapping of free slots.
    /// The default is 0.98.
    #[derivative(Default(value = "0.98"))]
    pub alpha: f64,

    /// The number of threads used by the construction. The default is 1.
    #[derivative(Default(value = "1"))]
    pub num_threads: usize,

    /// The number of partitions of a [`PartitionedPTHash`]. Zero, the
    /// default, means the same as the number of threads.
    pub num_partitions: usize,
}

/// Fatal build errors.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("Invalid configuration: `{parameter}` is {value}, but it {constraint}")]
    /// A parameter violates its constraint.
    InvalidConfiguration {
        parameter: &'static str,
        value: String,
        constraint: &'static str,
    },
    #[error("The pilot search with seed {seed} did not converge: try a different seed")]
    /// The search failed for the given seed.
    ConstructionFailure {
        seed: u64,
        #[source]
        cause: SolveError,
    },
    #[error("Cannot create the thread pool")]
    /// The thread pool could not be created.
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Transient error during the build, leading to a [construction
/// failure](BuildError::ConstructionFailure).
pub enum SolveError {
    #[error("Duplicate signature")]
    /// A duplicate signature was detected: most likely, there are duplicate
    /// keys.
    DuplicateSignature,
    #[error("No pilot found for bucket {bucket} after {attempts} attempts")]
    /// No pilot places a bucket.
    UnsolvableBucket { bucket: usize, attempts: u64 },
}

/// Minimal perfect hash functions that can be built from signatures.
///
/// This trait is implemented by [`PTHash`] and [`PartitionedPTHash`], and
/// makes it possible to choose the shape of the structure at the type level
/// through the type parameter of a [`PTHashBuilder`].
pub trait BuildMph: Mphf + Sized + Send + Sync {
    /// Whether the structure is split into partitions.
    const PARTITIONED: bool;

    /// The [name](Encoder::name) of the encoder of the pilots.
    fn encoder_name() -> &'static str;

    /// Build a structure from the signatures of the keys, computed using
    /// `seed`, on the current rayon thread pool.
    fn build_from_sigs(
        sigs: &[u64],
        config: &BuildConfig,
        seed: u64,
        pl: &mut (impl ProgressLog + Clone + Send + Sync),
    ) -> Result<Self, SolveError>;
}

impl<E: Encoder> BuildMph for PTHash<E> {
    const PARTITIONED: bool = false;

    fn encoder_name() -> &'static str {
        E::name()
    }

    fn build_from_sigs(
        sigs: &[u64],
        config: &BuildConfig,
        seed: u64,
        pl: &mut (impl ProgressLog + Clone + Send + Sync),
    ) -> Result<Self, SolveError> {
        Self::try_build_from_sigs(sigs, config.c, config.alpha, seed, pl)
    }
}

impl<E: Encoder> BuildMph for PartitionedPTHash<E> {
    const PARTITIONED: bool = true;

    fn encoder_name() -> &'static str {
        E::name()
    }

    fn build_from_sigs(
        sigs: &[u64],
        config: &BuildConfig,
        seed: u64,
        pl: &mut (impl ProgressLog + Clone + Send + Sync),
    ) -> Result<Self, SolveError> {
        Self::try_build_from_sigs(sigs, config, seed, pl)
    }
}

/// A builder for PTHash minimal perfect hash functions.
///
/// The type parameter `M` selects the shape of the structure
/// ([`PTHash`] or [`PartitionedPTHash`]) and the [`Encoder`] of its pilots.
/// The configuration is validated when the builder is created, so that
/// invalid parameters are reported before any key is processed.
///
/// Each build creates a rayon thread pool with
/// [`num_threads`](BuildConfig::num_threads) threads, and returns when all
/// work has completed. Building twice with the same keys, seed, and
/// configuration yields identical structures.
///
/// # Examples
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use mphf::prelude::*;
///
/// let keys = (0..10_000_u64).collect::<Vec<_>>();
/// let builder = PTHashBuilder::<PartitionedPTHash<EliasFanoEncoder>>::from_config(
///     BuildConfig::default().num_threads(2),
/// )?;
/// assert_eq!(
///     builder.name(),
///     "PTHash(encoder=elias_fano, c=4.5, alpha=0.98, threads=2, partitions=2)"
/// );
///
/// let mph = builder.build(&keys, 0, false)?;
/// let mut seen = vec![false; keys.len()];
/// for key in &keys {
///     let value = mph.get(key);
///     assert!(!seen[value]);
///     seen[value] = true;
/// }
/// #     Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PTHashBuilder<M = PTHash> {
    config: BuildConfig,
    name: String,
    _marker: PhantomData<fn() -> M>,
}

fn invalid(parameter: &'static str, value: impl ToString, constraint: &'static str) -> BuildError {
    BuildError::InvalidConfiguration {
        parameter,
        value: value.to_string(),
        constraint,
    }
}

impl<M: BuildMph> PTHashBuilder<M> {
    /// Create a builder with the given parameters.
    ///
    /// See [`BuildConfig`] for the meaning of the parameters.
    pub fn new(
        c: f64,
        alpha: f64,
        num_threads: usize,
        num_partitions: usize,
    ) -> Result<Self, BuildError> {
        Self::from_config(BuildConfig {
            c,
            alpha,
            num_threads,
            num_partitions,
        })
    }

    /// Create a builder from a configuration.
    ///
    /// Fails with [`BuildError::InvalidConfiguration`] if *c* is smaller than
    /// [`MIN_C`], if α is not in (0..1], or if the number of threads is zero.
    pub fn from_config(mut config: BuildConfig) -> Result<Self, BuildError> {
        // Negated comparisons reject NaN
        if !(config.c >= MIN_C) {
            return Err(invalid(
                "c",
                config.c,
                "must be greater than or equal to 1.45",
            ));
        }
        if !(config.alpha > 0.0 && config.alpha <= 1.0) {
            return Err(invalid(
                "alpha",
                config.alpha,
                "must be between 0 (excluded) and 1 (included)",
            ));
        }
        if config.num_threads == 0 {
            return Err(invalid("num_threads", config.num_threads, "must be at least 1"));
        }
        if config.num_partitions == 0 {
            config.num_partitions = config.num_threads;
        }

        let mut name = format!(
            "PTHash(encoder={}, c={}, alpha={}",
            M::encoder_name(),
            config.c,
            config.alpha
        );
        if M::PARTITIONED {
            name += &format!(
                ", threads={}, partitions={}",
                config.num_threads, config.num_partitions
            );
        }
        name.push(')');

        Ok(Self {
            config,
            name,
            _marker: PhantomData,
        })
    }

    /// Return a descriptive name containing the encoder and the parameters.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the (normalized) configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build a structure for the given keys.
    ///
    /// If `verbose` is true, the construction is logged using a
    /// [`ProgressLogger`]. Logging never changes the result.
    pub fn build<K: ToSig + Sync>(
        &self,
        keys: &[K],
        seed: u64,
        verbose: bool,
    ) -> Result<M, BuildError> {
        if verbose {
            self.try_build(keys, seed, &mut ProgressLogger::default())
        } else {
            self.try_build(keys, seed, no_logging![])
        }
    }

    /// Build a structure for the given keys, logging to the given progress
    /// logger.
    ///
    /// A failure of the pilot search is not retried: see
    /// [`PTHashBuilder::try_build_with_retries`].
    pub fn try_build<K: ToSig + Sync>(
        &self,
        keys: &[K],
        seed: u64,
        pl: &mut (impl ProgressLog + Clone + Send + Sync),
    ) -> Result<M, BuildError> {
        let thread_pool = self.thread_pool()?;
        self.try_build_in(&thread_pool, keys, seed, pl)
    }

    /// Build a structure for the given keys, trying up to `max_attempts`
    /// seeds.
    ///
    /// The first attempt uses `seed`; the following ones use seeds drawn from
    /// a [`SmallRng`] seeded with `seed`, so the sequence of attempts is
    /// deterministic. Only [construction
    /// failures](BuildError::ConstructionFailure) are retried; after
    /// `max_attempts` failures the last one is returned.
    pub fn try_build_with_retries<K: ToSig + Sync>(
        &self,
        keys: &[K],
        seed: u64,
        max_attempts: usize,
        pl: &mut (impl ProgressLog + Clone + Send + Sync),
    ) -> Result<M, BuildError> {
        let thread_pool = self.thread_pool()?;
        let mut prng = SmallRng::seed_from_u64(seed);
        let mut attempt_seed = seed;
        let mut attempt = 1;
        loop {
            match self.try_build_in(&thread_pool, keys, attempt_seed, pl) {
                Err(BuildError::ConstructionFailure { seed, cause }) if attempt < max_attempts => {
                    pl.warn(format_args!(
                        "Attempt {}/{} with seed {} failed ({}), trying again with a different seed...",
                        attempt, max_attempts, seed, cause
                    ));
                    attempt_seed = prng.random();
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn thread_pool(&self) -> Result<ThreadPool, BuildError> {
        Ok(ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()?)
    }

    fn try_build_in<K: ToSig + Sync>(
        &self,
        thread_pool: &ThreadPool,
        keys: &[K],
        seed: u64,
        pl: &mut (impl ProgressLog + Clone + Send + Sync),
    ) -> Result<M, BuildError> {
        pl.info(format_args!(
            "Building {} on {} keys with seed {} using {} threads",
            self.name,
            keys.len(),
            seed,
            thread_pool.current_num_threads()
        ));

        thread_pool
            .install(|| {
                pl.item_name("key");
                pl.expected_updates(Some(keys.len()));
                pl.start("Computing signatures...");
                let sigs = keys
                    .par_iter()
                    .map(|key| K::to_sig(key, seed))
                    .collect::<Vec<_>>();
                pl.done_with_count(keys.len());

                M::build_from_sigs(&sigs, &self.config, seed, pl)
            })
            .map_err(|cause| BuildError::ConstructionFailure { seed, cause })
    }
}
