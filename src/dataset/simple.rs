//! Simple/legacy rows: one row per autoregression step
//!
//! Each example expands into `group_size` rows of the full context length;
//! row k reveals the first k correct permutation tokens and targets the next
//! one. Dense training signal at a quadratic blow-up in rows, superseded by
//! the masked framing, kept for the legacy models.

use super::{RowBuilder, TaskRow};
use crate::codec::TokenCodec;
use crate::config::TaskConfig;
use crate::error::{Error, Result};

/// Builds `group_size` rows per example over a NULL-padded context.
pub struct SimpleBuilder {
    codec: TokenCodec,
    input_length: usize,
    context_length: usize,
    start_token: u32,
    null_token: u32,
    end_token: Option<u32>,
}

impl SimpleBuilder {
    /// Create the builder for a configuration.
    pub fn new(config: &TaskConfig) -> Self {
        Self {
            codec: TokenCodec::new(config),
            input_length: config.input_length,
            context_length: config.context_length(),
            start_token: config.start_prediction_token(),
            null_token: config.null_token(),
            end_token: config.end_prediction_token(),
        }
    }
}

impl RowBuilder for SimpleBuilder {
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

        // word + START + NULL padding: exactly context_length positions, the
        // padding length is context_length - len(word) - 1
        let mut context = word_tokens;
        let padding = self.context_length - context.len() - 1;
        context.push(self.start_token);
        context.extend(std::iter::repeat(self.null_token).take(padding));
        debug_assert_eq!(context.len(), self.context_length);

        let slot_base = word.len() + 1;
        let mut rows = Vec::with_capacity(perm_tokens.len() + 1);
        for (pos, &token) in perm_tokens.iter().enumerate() {
            rows.push(TaskRow { input: context.clone(), targets: vec![token] });
            context[slot_base + pos] = token;
        }
        // deprecated: legacy models also predicted an explicit END marker
        if let Some(end) = self.end_token {
            rows.push(TaskRow { input: context.clone(), targets: vec![end] });
        }

        Ok(rows)
    }
}
