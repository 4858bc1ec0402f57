//! Token codec
//!
//! The model vocabulary is partitioned into three disjoint ranges:
//! transposition tokens `[0, num_trans)`, permutation tokens
//! `[num_trans, num_normal)` and special tokens `[num_normal, vocab_size)`.
//! Permutation symbols are shifted by a fixed additive offset (`num_trans`) so
//! that word tokens and permutation tokens never collide even though both
//! derive from small integers.

use crate::config::TaskConfig;
use crate::error::{Error, Result};

/// Classification of a token by vocabulary range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// A generator symbol in the word region.
    Transposition,
    /// A shifted permutation symbol in the prediction region.
    Permutation,
    /// START_PREDICTION, NULL or the deprecated END_PREDICTION marker.
    Special,
}

/// Bidirectional mapping between group symbols and model tokens.
#[derive(Debug, Clone, Copy)]
pub struct TokenCodec {
    num_trans: usize,
    num_normal: usize,
    vocab_size: usize,
    group_size: usize,
}

impl TokenCodec {
    /// Derive the codec from a validated configuration.
    pub fn new(config: &TaskConfig) -> Self {
        Self {
            num_trans: config.num_trans(),
            num_normal: config.num_normal(),
            vocab_size: config.vocab_size(),
            group_size: config.group_size,
        }
    }

    /// Total vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Shift a permutation into the permutation-token range.
    ///
    /// Bijective with [`TokenCodec::tokens_to_perm`]. Fails fast when the
    /// slice length or a symbol disagrees with the configured group size.
    pub fn perm_to_tokens(&self, perm: &[usize]) -> Result<Vec<u32>> {
        if perm.len() != self.group_size {
            return Err(Error::config_mismatch(format!(
                "permutation length {} does not match group size {}",
                perm.len(),
                self.group_size
            )));
        }
        perm.iter()
            .map(|&symbol| {
                if symbol >= self.group_size {
                    return Err(Error::config_mismatch(format!(
                        "permutation symbol {symbol} outside [0, {})",
                        self.group_size
                    )));
                }
                Ok((symbol + self.num_trans) as u32)
            })
            .collect()
    }

    /// Map a generator word onto transposition tokens.
    ///
    /// Generator symbols are transposition tokens verbatim; this only
    /// validates that every symbol is inside the transposition range.
    pub fn word_to_tokens(&self, word: &[usize]) -> Result<Vec<u32>> {
        word.iter()
            .map(|&symbol| {
                if symbol >= self.num_trans {
                    return Err(Error::config_mismatch(format!(
                        "generator symbol {symbol} outside [0, {})",
                        self.num_trans
                    )));
                }
                Ok(symbol as u32)
            })
            .collect()
    }

    /// Undo the permutation-token shift.
    ///
    /// Fails on any token outside the permutation range; an out-of-range
    /// token always indicates a vocabulary-sizing bug.
    pub fn tokens_to_perm(&self, tokens: &[u32]) -> Result<Vec<usize>> {
        tokens
            .iter()
            .map(|&token| {
                let t = token as usize;
                if t < self.num_trans || t >= self.num_normal {
                    return Err(Error::CodecViolation { token, vocab_size: self.vocab_size });
                }
                Ok(t - self.num_trans)
            })
            .collect()
    }

    /// Classify a token by range membership. Total over `[0, vocab_size)`.
    pub fn token_type(&self, token: u32) -> Result<TokenType> {
        let t = token as usize;
        if t >= self.vocab_size {
            return Err(Error::CodecViolation { token, vocab_size: self.vocab_size });
        }
        if t < self.num_trans {
            Ok(TokenType::Transposition)
        } else if t < self.num_normal {
            Ok(TokenType::Permutation)
        } else {
            Ok(TokenType::Special)
        }
    }
}
