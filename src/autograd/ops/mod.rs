//! Autograd operations with backward passes

mod activations;
mod attention;
mod basic;
mod embedding;
mod matmul;
mod normalize;

pub use activations::{dropout, relu};
pub use attention::multi_head_attention;
pub use basic::{add, mul, narrow, scale, sum};
pub use embedding::embedding;
pub use matmul::{matmul, matmul_compute, transpose};
pub use normalize::layer_norm;
