//! Masked-training rows (the default framing)
//!
//! One row per example: the model sees the whole word plus the correctly
//! shifted permutation prefix (teacher forcing) and is trained on every
//! prediction position at once. The structural attention mask, not example
//! duplication, enforces the autoregressive view.

use super::{RowBuilder, TaskRow};
use crate::codec::TokenCodec;
use crate::config::TaskConfig;
use crate::error::{Error, Result};

/// Builds `input = word (padded to input_length) + START + perm[..G-1]`,
/// `targets = perm`: one logit row per permutation index.
pub struct MaskedBuilder {
    codec: TokenCodec,
    input_length: usize,
    start_token: u32,
    null_token: u32,
}

impl MaskedBuilder {
    /// Create the builder for a configuration.
    pub fn new(config: &TaskConfig) -> Self {
        Self {
            codec: TokenCodec::new(config),
            input_length: config.input_length,
            start_token: config.start_prediction_token(),
            null_token: config.null_token(),
        }
    }
}

impl RowBuilder for MaskedBuilder {
    fn build(&self, word: &[usize], perm: &[usize]) -> Result<Vec<TaskRow>> {
        if word.len() > self.input_length {
            return Err(Error::config_mismatch(format!(
                "word length {} exceeds input length {}",
                word.len(),
                self.input_length
            )));
        }
        let word_tokens = self.codec.word_to_tokens(word)?;
        let perm_tokens = self.codec.perm_to_tokens(perm)?;

        // the word region must span exactly input_length positions so the
        // precomputed mask boundary lines up
        let mut input = word_tokens;
        input.resize(self.input_length, self.null_token);
        input.push(self.start_token);
        input.extend_from_slice(&perm_tokens[..perm_tokens.len() - 1]);

        Ok(vec![TaskRow { input, targets: perm_tokens }])
    }
}
