/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unconditional_recursion)]

pub mod bits;
pub mod dict;
pub mod mph;
pub mod traits;
pub mod utils;

pub mod prelude {
    pub use crate::bits::*;
    pub use crate::dict::*;
    pub use crate::mph::pthash::*;
    pub use crate::traits::prelude::*;
    pub use crate::utils::ToSig;
}

/// Initializes the `env_logger` logger at the `Info` level, unless
/// overridden by the `RUST_LOG` environment variable.
pub fn init_env_logger() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()?;
    Ok(())
}
