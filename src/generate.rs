//! Autoregressive decoding
//!
//! One generation call walks Init → Decoding(step 0..G-1) → Done. Each step
//! runs the model forward, reads the logit row at the last produced position
//! and selects a token, either by plain argmax or by the constrained scan
//! that guarantees a valid, repeat-free permutation token stream.

use crate::codec::{TokenCodec, TokenType};
use crate::config::{TaskConfig, TaskMode};
use crate::error::{Error, Result};
use crate::model::Transformer;

/// Token-selection strategy for one decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Unconstrained argmax over the whole vocabulary. Diagnostic; the
    /// result may fail permutation validation.
    Greedy,
    /// Scan tokens by descending logit and pick the first unused
    /// permutation-type token. Always yields a bijection, even from an
    /// untrained model.
    Constrained,
}

/// Drives the model step-by-step to produce a validated group element.
pub struct Generator<'a> {
    model: &'a Transformer,
    codec: TokenCodec,
    config: &'a TaskConfig,
}

impl<'a> Generator<'a> {
    /// Create a generator for a model and its configuration.
    pub fn new(model: &'a Transformer, config: &'a TaskConfig) -> Self {
        Self { model, codec: TokenCodec::new(config), config }
    }

    /// Generate the permutation for a generator word with constrained
    /// decoding, the default success path.
    pub fn generate(&self, word: &[usize]) -> Result<Vec<usize>> {
        self.generate_with(word, DecodeStrategy::Constrained, None)
    }

    /// Generate with an explicit strategy and an optional early stop after
    /// fewer than `group_size` steps (diagnostic partial decoding).
    pub fn generate_with(
        &self,
        word: &[usize],
        strategy: DecodeStrategy,
        early_stop: Option<usize>,
    ) -> Result<Vec<usize>> {
        if self.config.mode == TaskMode::Reversed {
            return Err(Error::config_mismatch(
                "permutation generation is not defined for the reversed task; use generate_word",
            ));
        }
        if word.len() > self.config.input_length {
            return Err(Error::config_mismatch(format!(
                "word length {} exceeds input length {}",
                word.len(),
                self.config.input_length
            )));
        }
        let word_tokens = self.codec.word_to_tokens(word)?;

        let group_size = self.config.group_size;
        let steps = early_stop.map_or(group_size, |s| s.min(group_size));
        let input_length = self.config.input_length;
        let start = self.config.start_prediction_token();

        let mut chosen: Vec<u32> = Vec::with_capacity(steps);

        match self.config.mode {
            TaskMode::Masked => {
                // pre-sized context: padded word, START at the mask boundary,
                // NULL-filled prediction slots overwritten as tokens arrive
                let mut context = vec![self.config.null_token(); self.config.context_length()];
                context[..word_tokens.len()].copy_from_slice(&word_tokens);
                context[input_length] = start;

                for step in 0..steps {
                    let logits = self.model.forward(&context);
                    // the last produced position: START at step 0, then the
                    // slot written in the previous step
                    let row = self.model.logits_at(&logits, input_length + step);
                    let token = self.select(&row.to_vec(), strategy, &chosen, step)?;
                    context[input_length + 1 + step] = token;
                    chosen.push(token);
                }
            }
            TaskMode::Simple => {
                // the sequence grows by one position per step
                let mut context = word_tokens;
                context.push(start);

                for step in 0..steps {
                    let logits = self.model.forward(&context);
                    let row = self.model.logits_at(&logits, context.len() - 1);
                    let token = self.select(&row.to_vec(), strategy, &chosen, step)?;
                    context.push(token);
                    chosen.push(token);
                }
            }
            TaskMode::Reversed => unreachable!("rejected above"),
        }

        self.codec.tokens_to_perm(&chosen)
    }

    /// Decode a generator word from a permutation (reversed task).
    ///
    /// Selection is constrained to transposition tokens, with NULL acting as
    /// the terminator for words shorter than the input length.
    pub fn generate_word(&self, perm: &[usize]) -> Result<Vec<usize>> {
        if self.config.mode != TaskMode::Reversed {
            return Err(Error::config_mismatch(
                "word generation requires the reversed task framing",
            ));
        }
        let null = self.config.null_token();
        let mut context = self.codec.perm_to_tokens(perm)?;
        context.push(self.config.start_prediction_token());

        let mut word = Vec::new();
        for step in 0..self.config.input_length {
            let logits = self.model.forward(&context);
            let row = self.model.logits_at(&logits, context.len() - 1).to_vec();

            let mut ranked: Vec<usize> = (0..row.len()).collect();
            ranked.sort_by(|&a, &b| row[b].total_cmp(&row[a]));
            let token = ranked
                .into_iter()
                .map(|t| t as u32)
                .find(|&t| {
                    t == null
                        || matches!(self.codec.token_type(t), Ok(TokenType::Transposition))
                })
                .ok_or(Error::DecodeExhausted { step })?;

            if token == null {
                break;
            }
            context.push(token);
            word.push(token as usize);
        }
        Ok(word)
    }

    fn select(
        &self,
        row: &[f32],
        strategy: DecodeStrategy,
        already_chosen: &[u32],
        step: usize,
    ) -> Result<u32> {
        match strategy {
            DecodeStrategy::Greedy => {
                let best = row
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.total_cmp(b))
                    .map(|(i, _)| i as u32)
                    .expect("logit row is never empty");
                Ok(best)
            }
            DecodeStrategy::Constrained => {
                let mut ranked: Vec<usize> = (0..row.len()).collect();
                ranked.sort_by(|&a, &b| row[b].total_cmp(&row[a]));

                for candidate in ranked {
                    let token = candidate as u32;
                    if matches!(self.codec.token_type(token), Ok(TokenType::Permutation))
                        && !already_chosen.contains(&token)
                    {
                        return Ok(token);
                    }
                }
                // unreachable with a well-formed vocabulary; surfaced loudly
                eprintln!(
                    "constrained decoding found no unused permutation token at step {step}"
                );
                Err(Error::DecodeExhausted { step })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;
    use crate::group;

    fn is_bijection(perm: &[usize], group_size: usize) -> bool {
        let mut seen = vec![false; group_size];
        perm.len() == group_size
            && perm.iter().all(|&p| {
                if p >= group_size || seen[p] {
                    false
                } else {
                    seen[p] = true;
                    true
                }
            })
    }

    #[test]
    fn test_constrained_decode_is_a_bijection_on_untrained_model() {
        let config = TaskConfig::tiny();
        let model = Transformer::new(&config);
        let generator = Generator::new(&model, &config);

        for word in [vec![], vec![1, 2, 1], vec![3, 3], vec![0, 1, 0, 2, 0, 3]] {
            let perm = generator.generate(&word).unwrap();
            assert!(is_bijection(&perm, config.group_size), "{perm:?} is not a bijection");
        }
    }

    #[test]
    fn test_constrained_decode_simple_mode() {
        let mut config = TaskConfig::tiny();
        config.mode = crate::config::TaskMode::Simple;
        let model = Transformer::new(&config);
        let generator = Generator::new(&model, &config);
        let perm = generator.generate(&[2, 1]).unwrap();
        assert!(is_bijection(&perm, config.group_size));
    }

    #[test]
    fn test_early_stop_returns_partial_prefix() {
        let config = TaskConfig::tiny();
        let model = Transformer::new(&config);
        let generator = Generator::new(&model, &config);
        let partial = generator
            .generate_with(&[1], DecodeStrategy::Constrained, Some(2))
            .unwrap();
        assert_eq!(partial.len(), 2);
        assert_ne!(partial[0], partial[1]);
    }

    #[test]
    fn test_word_too_long_rejected() {
        let config = TaskConfig::tiny();
        let model = Transformer::new(&config);
        let generator = Generator::new(&model, &config);
        assert!(generator.generate(&[1; 7]).is_err());
    }

    #[test]
    fn test_reversed_mode_rejects_permutation_generation() {
        let mut config = TaskConfig::tiny();
        config.mode = crate::config::TaskMode::Reversed;
        let model = Transformer::new(&config);
        let generator = Generator::new(&model, &config);
        assert!(generator.generate(&[1]).is_err());
    }

    #[test]
    fn test_generate_word_yields_valid_symbols() {
        let mut config = TaskConfig::tiny();
        config.mode = crate::config::TaskMode::Reversed;
        let model = Transformer::new(&config);
        let generator = Generator::new(&model, &config);

        let word = generator.generate_word(&[0, 2, 1, 3]).unwrap();
        assert!(word.len() <= config.input_length);
        // every produced symbol must evaluate cleanly
        assert!(group::evaluate(&word, config.group_size, config.scheme).is_ok());
    }

    #[test]
    fn test_forward_mode_rejects_word_generation() {
        let config = TaskConfig::tiny();
        let model = Transformer::new(&config);
        let generator = Generator::new(&model, &config);
        assert!(generator.generate_word(&[0, 1, 2, 3]).is_err());
    }
}
