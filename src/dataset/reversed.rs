//! Reversed rows: predict the word from the permutation
//!
//! The inverse problem keeps the same token assignments as the forward task;
//! only the roles of the regions swap. The permutation is the known region,
//! the word slots form the prediction region.

use super::{RowBuilder, TaskRow};
use crate::codec::TokenCodec;
use crate::config::TaskConfig;
use crate::error::{Error, Result};

/// Builds `input = perm + START + word[..input_length - 1]`,
/// `targets = word`. The word is NULL-padded to `input_length` so the
/// region boundary stays fixed.
pub struct ReversedBuilder {
    codec: TokenCodec,
    input_length: usize,
    start_token: u32,
    null_token: u32,
}

impl ReversedBuilder {
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

impl RowBuilder for ReversedBuilder {
    fn build(&self, word: &[usize], perm: &[usize]) -> Result<Vec<TaskRow>> {
        if word.len() > self.input_length {
            return Err(Error::config_mismatch(format!(
                "word length {} exceeds input length {}",
                word.len(),
                self.input_length
            )));
        }
        let perm_tokens = self.codec.perm_to_tokens(perm)?;
        let mut word_tokens = self.codec.word_to_tokens(word)?;
        word_tokens.resize(self.input_length, self.null_token);

        let mut input = perm_tokens;
        input.push(self.start_token);
        input.extend_from_slice(&word_tokens[..self.input_length - 1]);

        Ok(vec![TaskRow { input, targets: word_tokens }])
    }
}
