//! Normalization autograd operations: batched layer norm

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Layer normalization over each position of a (seq_len × dim) input.
///
/// Every row is normalized to mean 0 and variance 1 independently, then
/// scaled by `gamma` and shifted by `beta` (both of length `dim`, shared
/// across positions):
///
/// LayerNorm(x) = gamma * (x - mean) / sqrt(var + epsilon) + beta
pub fn layer_norm(
    x: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
    seq_len: usize,
    dim: usize,
    epsilon: f32,
) -> Tensor {
    assert_eq!(x.len(), seq_len * dim, "layer_norm input size mismatch");
    assert_eq!(gamma.len(), dim, "gamma size mismatch");
    assert_eq!(beta.len(), dim, "beta size mismatch");

    let mut normalized = vec![0.0f32; seq_len * dim];
    let mut stds = vec![0.0f32; seq_len];
    let data = {
        let x_data = x.data();
        let x_slice = x_data.as_slice().expect("input must be contiguous");
        let gamma_data = gamma.data();
        let beta_data = beta.data();

        let mut out = vec![0.0f32; seq_len * dim];
        let n = dim as f32;
        for s in 0..seq_len {
            let row = &x_slice[s * dim..(s + 1) * dim];
            let mean: f32 = row.iter().sum::<f32>() / n;
            let var: f32 = row.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
            let std = (var + epsilon).sqrt();
            stds[s] = std;

            for (i, &v) in row.iter().enumerate() {
                let norm = (v - mean) / std;
                normalized[s * dim + i] = norm;
                out[s * dim + i] = norm * gamma_data[i] + beta_data[i];
            }
        }
        out
    };

    let requires_grad = x.requires_grad() || gamma.requires_grad() || beta.requires_grad();
    let mut result = Tensor::new(Array1::from(data), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(LayerNormBackward {
            x: x.clone(),
            gamma: gamma.clone(),
            beta: beta.clone(),
            normalized: Array1::from(normalized),
            stds,
            seq_len,
            dim,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct LayerNormBackward {
    x: Tensor,
    gamma: Tensor,
    beta: Tensor,
    normalized: Array1<f32>,
    stds: Vec<f32>,
    seq_len: usize,
    dim: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for LayerNormBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let grad_out = grad_output.as_slice().expect("gradient must be contiguous");
            let norm = self.normalized.as_slice().expect("buffer is contiguous");
            let dim = self.dim;
            let n = dim as f32;

            // ∂L/∂beta and ∂L/∂gamma sum over positions
            if self.beta.requires_grad() {
                let mut grad_beta = Array1::zeros(dim);
                for s in 0..self.seq_len {
                    for i in 0..dim {
                        grad_beta[i] += grad_out[s * dim + i];
                    }
                }
                self.beta.accumulate_grad(grad_beta);
            }

            if self.gamma.requires_grad() {
                let mut grad_gamma = Array1::zeros(dim);
                for s in 0..self.seq_len {
                    for i in 0..dim {
                        grad_gamma[i] += grad_out[s * dim + i] * norm[s * dim + i];
                    }
                }
                self.gamma.accumulate_grad(grad_gamma);
            }

            if self.x.requires_grad() {
                let gamma_data = self.gamma.data();
                let mut grad_x = Array1::zeros(self.seq_len * dim);
                for s in 0..self.seq_len {
                    let base = s * dim;
                    // gradient through the learned scale
                    let grad_norm: Vec<f32> =
                        (0..dim).map(|i| grad_out[base + i] * gamma_data[i]).collect();

                    let sum_grad: f32 = grad_norm.iter().sum();
                    let sum_grad_norm: f32 = grad_norm
                        .iter()
                        .zip(&norm[base..base + dim])
                        .map(|(g, v)| g * v)
                        .sum();

                    // ∂L/∂x_i = (g_i - mean(g) - norm_i * mean(g ⊙ norm)) / std
                    for i in 0..dim {
                        grad_x[base + i] = (grad_norm[i]
                            - sum_grad / n
                            - norm[base + i] * sum_grad_norm / n)
                            / self.stds[s];
                    }
                }
                drop(gamma_data);
                self.x.accumulate_grad(grad_x);
            }
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.x.clone(), self.gamma.clone(), self.beta.clone()]
    }
}
