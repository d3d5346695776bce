/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use dsi_progress_logger::*;
use mphf::prelude::*;
use rand::distr::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Distinct random alphanumeric strings.
fn random_strings(n: usize, seed: u64) -> Vec<String> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut keys = HashSet::new();
    while keys.len() < n {
        let len = rng.random_range(1..20);
        keys.insert(
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect::<String>(),
        );
    }
    let mut keys = keys.into_iter().collect::<Vec<_>>();
    keys.sort();
    keys
}

fn check_bijection<K: ToSig>(mph: &impl Mphf, keys: &[K]) {
    assert_eq!(mph.len(), keys.len());
    let mut seen = BitVec::new(keys.len());
    for key in keys {
        let value = mph.get(key);
        assert!(value < keys.len(), "{} >= {}", value, keys.len());
        assert!(!seen[value], "Value {} assigned twice", value);
        seen.set(value, true);
    }
}

fn check_all_encoders<K: ToSig + Sync>(keys: &[K], config: BuildConfig) -> Result<()> {
    check_bijection(
        &PTHashBuilder::<PTHash<CompactEncoder>>::from_config(config)?.build(keys, 0, false)?,
        keys,
    );
    check_bijection(
        &PTHashBuilder::<PTHash<PartitionedCompactEncoder>>::from_config(config)?
            .build(keys, 0, false)?,
        keys,
    );
    check_bijection(
        &PTHashBuilder::<PTHash<DictionaryEncoder>>::from_config(config)?.build(keys, 0, false)?,
        keys,
    );
    check_bijection(
        &PTHashBuilder::<PTHash<EliasFanoEncoder>>::from_config(config)?.build(keys, 0, false)?,
        keys,
    );
    check_bijection(
        &PTHashBuilder::<PartitionedPTHash<DictionaryEncoder>>::from_config(config)?
            .build(keys, 0, false)?,
        keys,
    );
    Ok(())
}

#[test]
fn test_bijection_strings() -> Result<()> {
    init_logger();
    let keys = random_strings(1000, 0);
    check_all_encoders(&keys, BuildConfig::default())?;
    check_all_encoders(&keys, BuildConfig::default().c(2.0).alpha(0.9))?;
    Ok(())
}

#[test]
fn test_bijection_integers() -> Result<()> {
    init_logger();
    let mut pl = ProgressLogger::default();
    for n in [0, 1, 2, 10, 1000, 100_000] {
        let keys = (0..n as u64).collect::<Vec<_>>();
        let builder = PTHashBuilder::<PTHash>::new(4.5, 0.98, 2, 0)?;
        let mph = builder.try_build(&keys, 0, &mut pl)?;
        check_bijection(&mph, &keys);
        assert_eq!(mph.is_empty(), n == 0);
    }
    Ok(())
}

#[test]
fn test_determinism() -> Result<()> {
    let keys = random_strings(5000, 1);
    let builder = PTHashBuilder::<PTHash>::new(3.0, 0.95, 1, 0)?;
    let first = builder.build(&keys, 17, false)?;
    let second = builder.build(&keys, 17, true)?;
    assert_eq!(first.num_bits(), second.num_bits());
    assert_eq!(first.pilots().decode(), second.pilots().decode());
    for key in &keys {
        assert_eq!(first.get(key), second.get(key));
    }

    let builder = PTHashBuilder::<PartitionedPTHash<CompactEncoder>>::new(4.5, 0.98, 4, 8)?;
    let first = builder.build(&keys, 3, false)?;
    let second = builder.build(&keys, 3, false)?;
    assert_eq!(first.num_bits(), second.num_bits());
    for key in &keys {
        assert_eq!(first.get(key), second.get(key));
    }
    Ok(())
}

#[test]
fn test_configuration_boundaries() -> Result<()> {
    let is_invalid = |c, alpha| {
        matches!(
            PTHashBuilder::<PTHash>::new(c, alpha, 1, 0),
            Err(BuildError::InvalidConfiguration { .. })
        )
    };
    assert!(is_invalid(1.44999, 0.98));
    assert!(!is_invalid(1.45, 0.98));
    assert!(is_invalid(4.5, 0.0));
    assert!(!is_invalid(4.5, 0.0001));
    assert!(!is_invalid(4.5, 1.0));
    assert!(is_invalid(4.5, 1.00001));

    // Extreme but valid values must also build
    let keys = (0..100_u64).collect::<Vec<_>>();
    check_bijection(
        &PTHashBuilder::<PTHash>::new(4.5, 0.0001, 1, 0)?.build(&keys, 0, false)?,
        &keys,
    );
    check_bijection(
        &PTHashBuilder::<PTHash>::new(1.45, 1.0, 1, 0)?.build(&keys, 0, false)?,
        &keys,
    );

    let err = PTHashBuilder::<PTHash>::new(4.5, 1.5, 1, 0).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("alpha"));
    assert!(message.contains("between 0 (excluded) and 1 (included)"));
    Ok(())
}

#[test]
fn test_small_c() -> Result<()> {
    init_logger();
    let keys = random_strings(10_000, 6);
    for c in [1.45, 1.5, 2.0] {
        for alpha in [0.94, 0.99] {
            let builder = PTHashBuilder::<PTHash>::new(c, alpha, 1, 0)?;
            let mph = builder.try_build_with_retries(&keys, 0, 5, no_logging![])?;
            check_bijection(&mph, &keys);
            // About c / lg n buckets per key
            assert!(mph.num_buckets() <= (c * 10_000.0 / 13.0) as usize);
        }
    }
    Ok(())
}

#[test]
fn test_full_load_power_of_two() -> Result<()> {
    init_logger();
    for n in [1024, 4096, 65536] {
        let keys = (0..n as u64).collect::<Vec<_>>();
        let builder = PTHashBuilder::<PTHash>::new(4.5, 1.0, 1, 0)?;
        let mph = builder.try_build_with_retries(&keys, 0, 3, no_logging![])?;
        assert_eq!(mph.table_size(), n as u64);
        check_bijection(&mph, &keys);
    }
    let keys = random_strings(4096, 7);
    let mph = PTHashBuilder::<PTHash<EliasFanoEncoder>>::new(2.0, 1.0, 1, 0)?
        .try_build_with_retries(&keys, 0, 3, no_logging![])?;
    check_bijection(&mph, &keys);
    Ok(())
}

#[test]
fn test_partition_equivalence() -> Result<()> {
    init_logger();
    let keys = random_strings(1000, 2);
    let one = PTHashBuilder::<PartitionedPTHash>::new(4.5, 0.98, 4, 1)?.build(&keys, 0, false)?;
    let four = PTHashBuilder::<PartitionedPTHash>::new(4.5, 0.98, 4, 4)?.build(&keys, 0, false)?;
    assert_eq!(one.num_partitions(), 1);
    assert_eq!(four.num_partitions(), 4);
    check_bijection(&one, &keys);
    check_bijection(&four, &keys);
    Ok(())
}

#[test]
fn test_thread_count_does_not_change_result() -> Result<()> {
    let keys = (0..50_000_u64).collect::<Vec<_>>();
    let single = PTHashBuilder::<PartitionedPTHash>::new(4.5, 0.98, 1, 4)?.build(&keys, 5, false)?;
    let multi = PTHashBuilder::<PartitionedPTHash>::new(4.5, 0.98, 4, 4)?.build(&keys, 5, false)?;
    for key in &keys {
        assert_eq!(single.get(key), multi.get(key));
    }
    Ok(())
}

#[test]
fn test_space_monotonicity() -> Result<()> {
    let keys = random_strings(10_000, 3);
    let small = PTHashBuilder::<PTHash<CompactEncoder>>::new(3.0, 0.99, 1, 0)?
        .build(&keys, 0, false)?;
    let large = PTHashBuilder::<PTHash<CompactEncoder>>::new(7.0, 0.99, 1, 0)?
        .build(&keys, 0, false)?;
    assert!(small.num_buckets() < large.num_buckets());
    assert!(small.num_bits() <= large.num_bits());
    Ok(())
}

#[test]
fn test_alphabet() -> Result<()> {
    let keys = ('a'..='z').map(String::from).collect::<Vec<_>>();
    let builder = PTHashBuilder::<PTHash>::new(1.5, 0.94, 1, 0)?;
    let mph = builder.build(&keys, 42, false)?;
    let mut values = keys.iter().map(|key| mph.get(key)).collect::<Vec<_>>();
    values.sort();
    assert_eq!(values, (0..26).collect::<Vec<_>>());
    assert!(mph.num_bits() > 0);
    assert!(mph.num_bits() < 26 * 64);
    assert_eq!(mph.seed(), 42);
    assert_eq!(mph.table_size(), 28);
    Ok(())
}

#[test]
fn test_names() -> Result<()> {
    assert_eq!(
        PTHashBuilder::<PTHash>::new(4.5, 0.98, 1, 0)?.name(),
        "PTHash(encoder=dictionary, c=4.5, alpha=0.98)"
    );
    assert_eq!(
        PTHashBuilder::<PTHash<CompactEncoder>>::new(6.0, 0.99, 8, 0)?.name(),
        "PTHash(encoder=compact, c=6, alpha=0.99)"
    );
    assert_eq!(
        PTHashBuilder::<PartitionedPTHash<PartitionedCompactEncoder>>::new(5.0, 1.0, 8, 0)?.name(),
        "PTHash(encoder=partitioned_compact, c=5, alpha=1, threads=8, partitions=8)"
    );
    assert_eq!(
        PTHashBuilder::<PartitionedPTHash<EliasFanoEncoder>>::new(4.5, 0.98, 2, 16)?.name(),
        "PTHash(encoder=elias_fano, c=4.5, alpha=0.98, threads=2, partitions=16)"
    );
    Ok(())
}

#[test]
fn test_retries() -> Result<()> {
    let builder = PTHashBuilder::<PTHash>::new(4.5, 0.98, 1, 0)?;

    // Duplicate keys fail with every seed
    let keys = ["a", "b", "c", "a"];
    match builder.try_build_with_retries(&keys, 0, 3, no_logging![]) {
        Err(BuildError::ConstructionFailure { cause, .. }) => {
            assert_eq!(cause, SolveError::DuplicateSignature)
        }
        Err(err) => panic!("Unexpected error {}", err),
        Ok(_) => panic!("Duplicate keys were not detected"),
    }

    // The first attempt uses the given seed
    let keys = random_strings(1000, 4);
    let mph = builder.try_build_with_retries(&keys, 99, 3, no_logging![])?;
    assert_eq!(mph.seed(), 99);
    let expected = builder.build(&keys, 99, false)?;
    for key in &keys {
        assert_eq!(mph.get(key), expected.get(key));
    }
    Ok(())
}

#[test]
fn test_non_members_in_range() -> Result<()> {
    let keys = (0..1000_u64).collect::<Vec<_>>();
    let mph = PTHashBuilder::<PTHash>::new(4.5, 0.8, 1, 0)?.build(&keys, 0, false)?;
    let partitioned =
        PTHashBuilder::<PartitionedPTHash>::new(4.5, 0.8, 2, 64)?.build(&keys, 0, false)?;
    let mut rng = SmallRng::seed_from_u64(0);
    for _ in 0..100_000 {
        let key: u64 = rng.random_range(1000..u64::MAX);
        assert!(mph.get(&key) < 1000);
        assert!(partitioned.get(&key) < 1000);
    }
    Ok(())
}

#[test]
fn test_single_key() -> Result<()> {
    let mph = PTHashBuilder::<PartitionedPTHash>::new(4.5, 0.98, 2, 0)?.build(&["only"], 0, false)?;
    assert_eq!(mph.len(), 1);
    assert_eq!(mph.get("only"), 0);
    assert_eq!(mph.get("other"), 0);
    Ok(())
}

#[test]
fn test_empty() -> Result<()> {
    let keys: [&str; 0] = [];
    let mph = PTHashBuilder::<PTHash>::new(4.5, 0.98, 1, 0)?.build(&keys, 0, false)?;
    assert!(mph.is_empty());
    assert!(mph.num_bits() > 0);
    let mph = PTHashBuilder::<PartitionedPTHash>::new(4.5, 0.98, 2, 0)?.build(&keys, 0, false)?;
    assert!(mph.is_empty());
    assert_eq!(mph.get("anything"), 0);
    Ok(())
}

#[test]
fn test_concurrent_queries() -> Result<()> {
    let keys = random_strings(10_000, 5);
    let mph = PTHashBuilder::<PTHash>::new(4.5, 0.98, 1, 0)?.build(&keys, 0, false)?;
    let expected = keys.iter().map(|key| mph.get(key)).collect::<Vec<_>>();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for (key, &value) in keys.iter().zip(&expected) {
                    assert_eq!(mph.get(key), value);
                }
            });
        }
    });
    Ok(())
}

#[cfg(feature = "slow_tests")]
#[test]
fn test_large() -> Result<()> {
    init_logger();
    let keys = (0..20_000_000_u64).collect::<Vec<_>>();
    let mut pl = ProgressLogger::default();
    let mph = PTHashBuilder::<PartitionedPTHash>::new(4.5, 0.98, 8, 0)?.try_build(&keys, 0, &mut pl)?;
    check_bijection(&mph, &keys);
    Ok(())
}
