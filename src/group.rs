//! Permutation-group algebra
//!
//! A generator word is evaluated by left-folding its symbols over the identity
//! permutation. The working buffer is owned by the call and mutated in place;
//! it is never aliased outside of it.
//!
//! Swap conventions (fixed, 0-indexed):
//! - elementary: symbol `i` (1 ≤ i < G) swaps positions `i-1` and `i`
//! - general: symbol `i` (1 ≤ i < G²) swaps positions `i / G` and `i % G`
//! - symbol 0 is always the identity

use crate::config::TranspositionScheme;
use crate::error::{Error, Result};

/// The identity permutation `[0, 1, ..., group_size - 1]`.
pub fn identity(group_size: usize) -> Vec<usize> {
    (0..group_size).collect()
}

/// Apply one generator symbol to `perm` in place.
///
/// The caller guarantees `symbol` is in range; `evaluate` performs the range
/// check once per word before any swap happens.
fn apply_generator(perm: &mut [usize], symbol: usize, scheme: TranspositionScheme) {
    if symbol == 0 {
        return;
    }
    let group_size = perm.len();
    match scheme {
        TranspositionScheme::Elementary => perm.swap(symbol - 1, symbol),
        TranspositionScheme::General => perm.swap(symbol / group_size, symbol % group_size),
    }
}

/// Number of distinct generator symbols for a scheme, including the identity.
fn num_symbols(group_size: usize, scheme: TranspositionScheme) -> usize {
    match scheme {
        TranspositionScheme::Elementary => group_size,
        TranspositionScheme::General => group_size * group_size,
    }
}

/// Evaluate a generator word to the permutation it composes.
///
/// Left-fold of `apply_generator` over the identity. Deterministic and
/// O(len(word)). Fails fast when a symbol is outside `[0, num_symbols)`.
pub fn evaluate(
    word: &[usize],
    group_size: usize,
    scheme: TranspositionScheme,
) -> Result<Vec<usize>> {
    let limit = num_symbols(group_size, scheme);
    if let Some(&bad) = word.iter().find(|&&s| s >= limit) {
        return Err(Error::config_mismatch(format!(
            "generator symbol {bad} outside [0, {limit}) for group size {group_size}"
        )));
    }

    let mut perm = identity(group_size);
    for &symbol in word {
        apply_generator(&mut perm, symbol, scheme);
    }
    Ok(perm)
}

/// True iff the word composes to the identity permutation.
pub fn is_identity(
    word: &[usize],
    group_size: usize,
    scheme: TranspositionScheme,
) -> Result<bool> {
    Ok(evaluate(word, group_size, scheme)? == identity(group_size))
}
