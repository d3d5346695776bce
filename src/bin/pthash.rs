/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fs::File;
use std::hint::black_box;
use std::io::{BufRead, BufReader};
use std::time::Instant;

use anyhow::{ensure, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use dsi_progress_logger::*;
use mem_dbg::{MemSize, SizeFlags};
use mphf::{init_env_logger, prelude::*};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PilotEncoder {
    Compact,
    PartitionedCompact,
    Dictionary,
    EliasFano,
}

#[derive(Parser, Debug)]
#[command(about = "Builds a PTHash minimal perfect hash function, checks that it is a bijection, and reports its size and speed", long_about = None)]
#[clap(group(
            ArgGroup::new("input")
                .required(true)
                .args(&["filename", "n"]),
))]
struct Args {
    #[arg(short, long)]
    /// A file containing UTF-8 keys, one per line.
    filename: Option<String>,
    #[arg(short)]
    /// Use the 64-bit keys [0..n). Mainly useful for testing and debugging.
    n: Option<usize>,
    /// The ratio between the number of buckets and n / lg n.
    #[arg(short, default_value_t = 4.5)]
    c: f64,
    /// The load factor of the intermediate table.
    #[arg(short, long, default_value_t = 0.98)]
    alpha: f64,
    /// Use this number of threads.
    #[arg(short, long, default_value_t = 1)]
    threads: usize,
    /// The number of partitions (0 means the number of threads). Used only
    /// with --partitioned.
    #[arg(short, long, default_value_t = 0)]
    partitions: usize,
    /// Build a partitioned function.
    #[arg(long)]
    partitioned: bool,
    /// The encoder for the pilots.
    #[arg(short, long, value_enum, default_value_t = PilotEncoder::Dictionary)]
    encoder: PilotEncoder,
    /// The construction seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// The maximum number of seeds to try.
    #[arg(long, default_value_t = 1)]
    attempts: usize,
}

fn main() -> Result<()> {
    init_env_logger()?;

    let args = Args::parse();

    if let Some(filename) = &args.filename {
        let keys = BufReader::new(File::open(filename)?)
            .lines()
            .collect::<Result<Vec<_>, _>>()?;
        main_with_keys(&args, &keys)
    } else {
        // The argument group guarantees that n is present
        let keys = (0..args.n.unwrap_or(0) as u64).collect::<Vec<_>>();
        main_with_keys(&args, &keys)
    }
}

fn main_with_keys<K: ToSig + Sync>(args: &Args, keys: &[K]) -> Result<()> {
    match (args.partitioned, args.encoder) {
        (false, PilotEncoder::Compact) => main_with_types::<PTHash<CompactEncoder>, _>(args, keys),
        (false, PilotEncoder::PartitionedCompact) => {
            main_with_types::<PTHash<PartitionedCompactEncoder>, _>(args, keys)
        }
        (false, PilotEncoder::Dictionary) => {
            main_with_types::<PTHash<DictionaryEncoder>, _>(args, keys)
        }
        (false, PilotEncoder::EliasFano) => {
            main_with_types::<PTHash<EliasFanoEncoder>, _>(args, keys)
        }
        (true, PilotEncoder::Compact) => {
            main_with_types::<PartitionedPTHash<CompactEncoder>, _>(args, keys)
        }
        (true, PilotEncoder::PartitionedCompact) => {
            main_with_types::<PartitionedPTHash<PartitionedCompactEncoder>, _>(args, keys)
        }
        (true, PilotEncoder::Dictionary) => {
            main_with_types::<PartitionedPTHash<DictionaryEncoder>, _>(args, keys)
        }
        (true, PilotEncoder::EliasFano) => {
            main_with_types::<PartitionedPTHash<EliasFanoEncoder>, _>(args, keys)
        }
    }
}

fn main_with_types<M: BuildMph + MemSize, K: ToSig + Sync>(args: &Args, keys: &[K]) -> Result<()> {
    let builder = PTHashBuilder::<M>::from_config(
        BuildConfig::default()
            .c(args.c)
            .alpha(args.alpha)
            .num_threads(args.threads)
            .num_partitions(args.partitions),
    )?;

    let mut pl = ProgressLogger::default();
    pl.display_memory(true);

    let mph = builder.try_build_with_retries(keys, args.seed, args.attempts.max(1), &mut pl)?;

    pl.item_name("key");
    pl.expected_updates(Some(keys.len()));
    pl.start("Checking that the function is a bijection...");
    let mut seen = BitVec::new(keys.len());
    for key in keys {
        let value = mph.get(key);
        ensure!(value < keys.len(), "Value {} out of range", value);
        ensure!(!seen[value], "Value {} assigned twice", value);
        seen.set(value, true);
        pl.light_update();
    }
    pl.done();

    let start = Instant::now();
    for key in keys {
        black_box(mph.get(key));
    }
    let elapsed = start.elapsed();

    pl.info(format_args!(
        "{}: {} keys, {:.3} bits/key, {:.1} ns/key, {} bytes in memory",
        builder.name(),
        mph.len(),
        mph.bits_per_key(),
        elapsed.as_nanos() as f64 / keys.len().max(1) as f64,
        mph.mem_size(SizeFlags::default())
    ));

    Ok(())
}
