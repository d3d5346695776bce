/*
 *
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Utility traits and implementations.

*/

pub mod sig;
pub use sig::*;

/// Return the position of the one of given rank in `word`.
///
/// The result is 64 if `word` has fewer than `rank + 1` ones.
#[inline(always)]
pub fn select_in_word(mut word: u64, rank: usize) -> usize {
    for _ in 0..rank {
        // reset the lowest set bits (BLSR)
        word &= word.wrapping_sub(1);
    }
    word.trailing_zeros() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_in_word() {
        let word = 0b1011_0010_u64;
        assert_eq!(select_in_word(word, 0), 1);
        assert_eq!(select_in_word(word, 1), 4);
        assert_eq!(select_in_word(word, 2), 5);
        assert_eq!(select_in_word(word, 3), 7);
        assert_eq!(select_in_word(word, 4), 64);
        assert_eq!(select_in_word(u64::MAX, 63), 63);
    }
}
