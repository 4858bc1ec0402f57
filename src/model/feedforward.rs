//! Position-wise feed-forward network

use crate::autograd::{self, matmul, relu, Tensor};
use crate::model::init_weight;
use rand::rngs::StdRng;

/// Two-layer MLP with a 4× hidden expansion and ReLU, applied independently
/// at every position.
pub struct FeedForward {
    pub w_in: Tensor,
    pub w_out: Tensor,
    n_embed: usize,
}

impl FeedForward {
    /// Create the layer with Xavier-scaled weights.
    pub fn new(n_embed: usize, rng: &mut StdRng) -> Self {
        let hidden = 4 * n_embed;
        let scale_in = (2.0 / (n_embed + hidden) as f32).sqrt();
        let scale_out = (2.0 / (hidden + n_embed) as f32).sqrt();
        Self {
            w_in: init_weight(n_embed * hidden, scale_in, rng),
            w_out: init_weight(hidden * n_embed, scale_out, rng),
            n_embed,
        }
    }

    /// Forward pass over a (seq_len × n_embed) input, with dropout on the
    /// output during training.
    pub fn forward(
        &self,
        x: &Tensor,
        seq_len: usize,
        mut dropout: Option<(f32, &mut StdRng)>,
    ) -> Tensor {
        let hidden = 4 * self.n_embed;
        let h = relu(&matmul(x, &self.w_in, seq_len, self.n_embed, hidden));
        let mut out = matmul(&h, &self.w_out, seq_len, hidden, self.n_embed);
        if let Some((p, rng)) = dropout.as_mut() {
            out = autograd::dropout(&out, *p, rng);
        }
        out
    }

    /// All trainable parameters.
    pub fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.w_in, &self.w_out]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{backward, sum};
    use rand::SeedableRng;

    #[test]
    fn test_forward_shape() {
        let mut rng = StdRng::seed_from_u64(0);
        let ffwd = FeedForward::new(8, &mut rng);
        let x = Tensor::from_vec(vec![0.1; 2 * 8], true);
        let out = ffwd.forward(&x, 2, None);
        assert_eq!(out.len(), 2 * 8);
    }

    #[test]
    fn test_weight_sizes() {
        let mut rng = StdRng::seed_from_u64(0);
        let ffwd = FeedForward::new(8, &mut rng);
        assert_eq!(ffwd.w_in.len(), 8 * 32);
        assert_eq!(ffwd.w_out.len(), 32 * 8);
    }

    #[test]
    fn test_gradients_reach_both_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        let ffwd = FeedForward::new(4, &mut rng);
        let x = Tensor::from_vec(vec![0.5; 3 * 4], true);
        let mut loss = sum(&ffwd.forward(&x, 3, None));
        backward(&mut loss, None);
        assert!(ffwd.w_in.grad().is_some());
        assert!(ffwd.w_out.grad().is_some());
    }
}
