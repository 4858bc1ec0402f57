//! Multi-head self-attention layer

use crate::autograd::{self, matmul, Tensor};
use crate::model::init_weight;
use crate::model::mask::AttentionMask;
use rand::rngs::StdRng;

/// Multi-head self-attention with full-width Q/K/V/O projections.
///
/// Head splitting happens inside the attention op; this layer owns the four
/// projection matrices, all (n_embed × n_embed) without bias.
pub struct MultiHeadAttention {
    pub w_q: Tensor,
    pub w_k: Tensor,
    pub w_v: Tensor,
    pub w_o: Tensor,
    n_embed: usize,
    n_head: usize,
}

impl MultiHeadAttention {
    /// Create the layer with Xavier-scaled weights.
    pub fn new(n_embed: usize, n_head: usize, rng: &mut StdRng) -> Self {
        let scale = (2.0 / (n_embed + n_embed) as f32).sqrt();
        Self {
            w_q: init_weight(n_embed * n_embed, scale, rng),
            w_k: init_weight(n_embed * n_embed, scale, rng),
            w_v: init_weight(n_embed * n_embed, scale, rng),
            w_o: init_weight(n_embed * n_embed, scale, rng),
            n_embed,
            n_head,
        }
    }

    /// Forward pass over a (seq_len × n_embed) input.
    ///
    /// `mask` restricts which positions may attend to which; `dropout` is
    /// applied to the attention weights and to the projected output during
    /// training.
    pub fn forward(
        &self,
        x: &Tensor,
        seq_len: usize,
        mask: Option<&AttentionMask>,
        mut dropout: Option<(f32, &mut StdRng)>,
    ) -> Tensor {
        let n = self.n_embed;
        let q = matmul(x, &self.w_q, seq_len, n, n);
        let k = matmul(x, &self.w_k, seq_len, n, n);
        let v = matmul(x, &self.w_v, seq_len, n, n);

        let sub_mask = mask.map(|m| m.for_len(seq_len));
        let attn = {
            let attn_dropout = dropout.as_mut().map(|(p, rng)| (*p, &mut **rng));
            autograd::multi_head_attention(
                &q,
                &k,
                &v,
                seq_len,
                n,
                self.n_head,
                sub_mask.as_deref(),
                attn_dropout,
            )
        };

        let mut out = matmul(&attn, &self.w_o, seq_len, n, n);
        if let Some((p, rng)) = dropout.as_mut() {
            out = autograd::dropout(&out, *p, rng);
        }
        out
    }

    /// All trainable parameters.
    pub fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.w_q, &self.w_k, &self.w_v, &self.w_o]
    }
}
