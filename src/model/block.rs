//! Transformer block: communication followed by computation

use crate::autograd::{add, layer_norm, Tensor};
use crate::model::attention::MultiHeadAttention;
use crate::model::feedforward::FeedForward;
use crate::model::mask::AttentionMask;
use crate::model::LN_EPSILON;
use rand::rngs::StdRng;

/// Pre-norm transformer block.
///
/// x = x + attention(ln1(x)); x = x + feed_forward(ln2(x))
pub struct Block {
    pub ln1_gamma: Tensor,
    pub ln1_beta: Tensor,
    pub attn: MultiHeadAttention,
    pub ln2_gamma: Tensor,
    pub ln2_beta: Tensor,
    pub ffwd: FeedForward,
    n_embed: usize,
}

impl Block {
    /// Create a block with identity layer norms and Xavier-scaled sublayers.
    pub fn new(n_embed: usize, n_head: usize, rng: &mut StdRng) -> Self {
        Self {
            ln1_gamma: Tensor::ones(n_embed, true),
            ln1_beta: Tensor::zeros(n_embed, true),
            attn: MultiHeadAttention::new(n_embed, n_head, rng),
            ln2_gamma: Tensor::ones(n_embed, true),
            ln2_beta: Tensor::zeros(n_embed, true),
            ffwd: FeedForward::new(n_embed, rng),
            n_embed,
        }
    }

    /// Forward pass over a (seq_len × n_embed) input.
    pub fn forward(
        &self,
        x: &Tensor,
        seq_len: usize,
        mask: Option<&AttentionMask>,
        mut dropout: Option<(f32, &mut StdRng)>,
    ) -> Tensor {
        let normed = layer_norm(x, &self.ln1_gamma, &self.ln1_beta, seq_len, self.n_embed, LN_EPSILON);
        let attn_out = {
            let d = dropout.as_mut().map(|(p, rng)| (*p, &mut **rng));
            self.attn.forward(&normed, seq_len, mask, d)
        };
        let x = add(x, &attn_out);

        let normed = layer_norm(&x, &self.ln2_gamma, &self.ln2_beta, seq_len, self.n_embed, LN_EPSILON);
        let ffwd_out = {
            let d = dropout.as_mut().map(|(p, rng)| (*p, &mut **rng));
            self.ffwd.forward(&normed, seq_len, d)
        };
        add(&x, &ffwd_out)
    }

    /// All trainable parameters.
    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = vec![&self.ln1_gamma, &self.ln1_beta];
        params.extend(self.attn.parameters());
        params.push(&self.ln2_gamma);
        params.push(&self.ln2_beta);
        params.extend(self.ffwd.parameters());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{backward, sum};
    use rand::SeedableRng;

    #[test]
    fn test_forward_preserves_shape() {
        let mut rng = StdRng::seed_from_u64(0);
        let block = Block::new(8, 2, &mut rng);
        let x = Tensor::from_vec(vec![0.1; 3 * 8], true);
        let out = block.forward(&x, 3, None, None);
        assert_eq!(out.len(), 3 * 8);
        assert!(out.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_parameter_count() {
        let mut rng = StdRng::seed_from_u64(0);
        let block = Block::new(8, 2, &mut rng);
        // 2 norms × (gamma, beta) + 4 attention + 2 ffwd
        assert_eq!(block.parameters().len(), 10);
    }

    #[test]
    fn test_residual_path_carries_gradient_through_blocks() {
        // the input appears in two paths (residual and sublayer); both must
        // contribute exactly once to the gradient
        let mut rng = StdRng::seed_from_u64(3);
        let block = Block::new(4, 2, &mut rng);
        let x = Tensor::from_vec(vec![0.2; 2 * 4], true);
        let mut loss = sum(&block.forward(&x, 2, None, None));
        backward(&mut loss, None);

        let grad = x.grad().expect("input should get a gradient");
        assert!(grad.iter().all(|g| g.is_finite()));
        assert!(grad.iter().any(|&g| g != 0.0));
    }
}
