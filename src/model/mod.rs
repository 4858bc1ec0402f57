//! Transformer model for the generator-word tasks
//!
//! The layers follow the usual decoder recipe (pre-norm blocks, learned
//! positional embeddings, untied output head) on top of the crate's autograd
//! engine. The structural attention mask that distinguishes the word region
//! from the prediction region lives in [`mask`].

mod attention;
mod block;
mod feedforward;
mod mask;
mod transformer;

pub use attention::MultiHeadAttention;
pub use block::Block;
pub use feedforward::FeedForward;
pub use mask::AttentionMask;
pub use transformer::Transformer;

use crate::autograd::Tensor;
use rand::rngs::StdRng;
use rand::Rng;

/// Layer-norm epsilon shared by every normalization site.
pub const LN_EPSILON: f32 = 1e-5;

/// Uniform weight init in `[-scale, scale]`.
pub(crate) fn init_weight(len: usize, scale: f32, rng: &mut StdRng) -> Tensor {
    Tensor::from_vec((0..len).map(|_| rng.gen_range(-scale..scale)).collect(), true)
}
