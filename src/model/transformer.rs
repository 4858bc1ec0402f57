//! The transformer model

use crate::autograd::{add, embedding, layer_norm, matmul, narrow, Tensor};
use crate::config::{TaskConfig, TaskMode};
use crate::error::{Error, Result};
use crate::io::{Model, ModelMetadata};
use crate::model::block::Block;
use crate::model::mask::AttentionMask;
use crate::model::{init_weight, LN_EPSILON};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Decoder-style transformer for the word → permutation task.
///
/// Token and position embeddings are summed, run through pre-norm blocks
/// under the structural attention mask of the configured task framing, then
/// normalized and projected to per-position vocabulary logits.
pub struct Transformer {
    pub token_embedding: Tensor,
    pub position_embedding: Tensor,
    pub blocks: Vec<Block>,
    pub ln_f_gamma: Tensor,
    pub ln_f_beta: Tensor,
    pub lm_head: Tensor,
    mask: Option<AttentionMask>,
    mode: TaskMode,
    vocab_size: usize,
    n_embed: usize,
    context_length: usize,
    group_size: usize,
    input_length: usize,
    dropout: f32,
}

impl Transformer {
    /// Create a freshly initialized model. Initialization is seeded from the
    /// config for reproducibility.
    pub fn new(config: &TaskConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let vocab_size = config.vocab_size();
        let n_embed = config.n_embed;
        let context_length = config.context_length();

        let embed_scale = (1.0 / n_embed as f32).sqrt();
        let head_scale = (2.0 / (n_embed + vocab_size) as f32).sqrt();

        // the structural mask exists only for the framings trained with
        // teacher forcing; the simple framing reveals tokens row by row and
        // attends bidirectionally, as the legacy models did
        let mask = match config.mode {
            TaskMode::Masked => Some(AttentionMask::new(context_length, config.input_length)),
            TaskMode::Reversed => Some(AttentionMask::new(context_length, config.group_size)),
            TaskMode::Simple => None,
        };

        Self {
            token_embedding: init_weight(vocab_size * n_embed, embed_scale, &mut rng),
            position_embedding: init_weight(context_length * n_embed, embed_scale, &mut rng),
            blocks: (0..config.n_blocks)
                .map(|_| Block::new(n_embed, config.n_head, &mut rng))
                .collect(),
            ln_f_gamma: Tensor::ones(n_embed, true),
            ln_f_beta: Tensor::zeros(n_embed, true),
            lm_head: init_weight(n_embed * vocab_size, head_scale, &mut rng),
            mask,
            mode: config.mode,
            vocab_size,
            n_embed,
            context_length,
            group_size: config.group_size,
            input_length: config.input_length,
            dropout: config.dropout,
        }
    }

    /// Evaluation-mode forward pass: (seq_len × vocab_size) logits, flattened.
    pub fn forward(&self, tokens: &[u32]) -> Tensor {
        self.forward_inner(tokens, None)
    }

    /// Training-mode forward pass with dropout active.
    pub fn forward_train(&self, tokens: &[u32], rng: &mut StdRng) -> Tensor {
        if self.dropout > 0.0 {
            self.forward_inner(tokens, Some((self.dropout, rng)))
        } else {
            self.forward_inner(tokens, None)
        }
    }

    fn forward_inner(&self, tokens: &[u32], mut dropout: Option<(f32, &mut StdRng)>) -> Tensor {
        let seq_len = tokens.len();
        assert!(
            seq_len <= self.context_length,
            "sequence of {seq_len} tokens exceeds context {}",
            self.context_length
        );

        let tok_emb = embedding(&self.token_embedding, tokens, self.n_embed);
        let positions: Vec<u32> = (0..seq_len as u32).collect();
        let pos_emb = embedding(&self.position_embedding, &positions, self.n_embed);
        let mut x = add(&tok_emb, &pos_emb);

        for block in &self.blocks {
            let d = dropout.as_mut().map(|(p, rng)| (*p, &mut **rng));
            x = block.forward(&x, seq_len, self.mask.as_ref(), d);
        }

        let x = layer_norm(&x, &self.ln_f_gamma, &self.ln_f_beta, seq_len, self.n_embed, LN_EPSILON);
        matmul(&x, &self.lm_head, seq_len, self.n_embed, self.vocab_size)
    }

    /// Slice the positions a task framing computes loss over: the last
    /// `group_size` positions (masked), the last `input_length` positions
    /// (reversed), or only the final position (simple/legacy).
    pub fn training_logits(&self, logits: &Tensor, seq_len: usize) -> Tensor {
        let positions = self.target_positions();
        assert!(positions <= seq_len, "sequence shorter than the target region");
        narrow(
            logits,
            (seq_len - positions) * self.vocab_size,
            positions * self.vocab_size,
        )
    }

    /// Number of positions the loss is computed over per row.
    pub fn target_positions(&self) -> usize {
        match self.mode {
            TaskMode::Masked => self.group_size,
            TaskMode::Reversed => self.input_length,
            TaskMode::Simple => 1,
        }
    }

    /// The logit row of one position.
    pub fn logits_at(&self, logits: &Tensor, position: usize) -> Tensor {
        narrow(logits, position * self.vocab_size, self.vocab_size)
    }

    /// Vocabulary size the head projects to.
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Attention mask in use, if the framing has one.
    pub fn mask(&self) -> Option<&AttentionMask> {
        self.mask.as_ref()
    }

    /// All trainable parameters. Clones share storage with the model, so the
    /// optimizer's updates are visible to the next forward pass.
    pub fn parameters(&self) -> Vec<Tensor> {
        self.named_parameters().into_iter().map(|(_, t)| t).collect()
    }

    /// Parameters with stable names, used for checkpoint round-trips.
    pub fn named_parameters(&self) -> Vec<(String, Tensor)> {
        let mut params = vec![
            ("token_embedding".to_string(), self.token_embedding.clone()),
            ("position_embedding".to_string(), self.position_embedding.clone()),
        ];
        for (i, block) in self.blocks.iter().enumerate() {
            params.push((format!("blocks.{i}.ln1.gamma"), block.ln1_gamma.clone()));
            params.push((format!("blocks.{i}.ln1.beta"), block.ln1_beta.clone()));
            params.push((format!("blocks.{i}.attn.w_q"), block.attn.w_q.clone()));
            params.push((format!("blocks.{i}.attn.w_k"), block.attn.w_k.clone()));
            params.push((format!("blocks.{i}.attn.w_v"), block.attn.w_v.clone()));
            params.push((format!("blocks.{i}.attn.w_o"), block.attn.w_o.clone()));
            params.push((format!("blocks.{i}.ln2.gamma"), block.ln2_gamma.clone()));
            params.push((format!("blocks.{i}.ln2.beta"), block.ln2_beta.clone()));
            params.push((format!("blocks.{i}.ffwd.w_in"), block.ffwd.w_in.clone()));
            params.push((format!("blocks.{i}.ffwd.w_out"), block.ffwd.w_out.clone()));
        }
        params.push(("ln_f.gamma".to_string(), self.ln_f_gamma.clone()));
        params.push(("ln_f.beta".to_string(), self.ln_f_beta.clone()));
        params.push(("lm_head".to_string(), self.lm_head.clone()));
        params
    }

    /// Total scalar parameter count.
    pub fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, t)| t.len()).sum()
    }

    /// Package the current parameters as a checkpointable model.
    pub fn to_checkpoint(&self, name: &str) -> Model {
        Model::new(ModelMetadata::new(name, "transformer"), self.named_parameters())
    }

    /// Restore parameters from a checkpoint by name.
    ///
    /// Every model parameter must be present with a matching length; extra
    /// checkpoint entries are ignored.
    pub fn load_parameters(&mut self, checkpoint: &Model) -> Result<()> {
        for (name, param) in self.named_parameters() {
            let stored = checkpoint.get_parameter(&name).ok_or_else(|| Error::ShapeMismatch {
                name: name.clone(),
                expected: param.len(),
                actual: 0,
            })?;
            if stored.len() != param.len() {
                return Err(Error::ShapeMismatch {
                    name,
                    expected: param.len(),
                    actual: stored.len(),
                });
            }
            param.data_mut().assign(&*stored.data());
        }
        Ok(())
    }
}
