//! Multi-head scaled dot-product attention with a structural mask
//!
//! Attention(Q, K, V) = softmax(mask(Q @ K^T / sqrt(d_head))) @ V, computed
//! per head over column slices of the projected inputs. Masked score entries
//! are set to −∞ before the softmax, so their attention weight is exactly
//! zero and no gradient flows through them.

use crate::autograd::ops::matmul::{matmul_compute, transpose};
use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

/// Multi-head attention over full-width projections.
///
/// `q`, `k`, `v` are (seq_len × n_embed) flattened; head `h` reads columns
/// `[h * head_dim, (h + 1) * head_dim)`. `mask` is a row-major
/// (seq_len × seq_len) boolean matrix where `true` means "may attend";
/// `None` leaves attention fully bidirectional. `dropout` zeroes attention
/// weights during training.
pub fn multi_head_attention(
    q: &Tensor,
    k: &Tensor,
    v: &Tensor,
    seq_len: usize,
    n_embed: usize,
    n_head: usize,
    mask: Option<&[bool]>,
    mut dropout: Option<(f32, &mut StdRng)>,
) -> Tensor {
    assert_eq!(q.len(), seq_len * n_embed, "Q size mismatch");
    assert_eq!(k.len(), seq_len * n_embed, "K size mismatch");
    assert_eq!(v.len(), seq_len * n_embed, "V size mismatch");
    assert!(n_head > 0 && n_embed % n_head == 0, "head count must divide width");
    if let Some(m) = mask {
        assert_eq!(m.len(), seq_len * seq_len, "mask size mismatch");
    }

    let head_dim = n_embed / n_head;
    let scale = (head_dim as f32).sqrt();

    let mut output = vec![0.0f32; seq_len * n_embed];
    let mut head_weights: Vec<Vec<f32>> = Vec::with_capacity(n_head);
    let mut head_drop_masks: Vec<Option<Vec<f32>>> = Vec::with_capacity(n_head);

    {
        let q_data = q.data();
        let k_data = k.data();
        let v_data = v.data();
        let q_slice = q_data.as_slice().expect("Q must be contiguous");
        let k_slice = k_data.as_slice().expect("K must be contiguous");
        let v_slice = v_data.as_slice().expect("V must be contiguous");

        for h in 0..n_head {
            let q_h = extract_head(q_slice, seq_len, n_embed, h, head_dim);
            let k_h = extract_head(k_slice, seq_len, n_embed, h, head_dim);
            let v_h = extract_head(v_slice, seq_len, n_embed, h, head_dim);

            // scores = Q_h @ K_h^T / sqrt(head_dim)
            let k_t = transpose(&k_h, seq_len, head_dim);
            let mut scores = matmul_compute(&q_h, &k_t, seq_len, head_dim, seq_len);
            for score in &mut scores {
                *score /= scale;
            }
            if let Some(allowed) = mask {
                for (score, &ok) in scores.iter_mut().zip(allowed) {
                    if !ok {
                        *score = f32::NEG_INFINITY;
                    }
                }
            }

            let weights = softmax_rows(&scores, seq_len);

            // optional dropout on the attention weights (training only)
            let (weights_used, drop_mask) = match dropout.as_mut() {
                Some((p, rng)) if *p > 0.0 => {
                    let keep_scale = 1.0 / (1.0 - *p);
                    let dmask: Vec<f32> = (0..weights.len())
                        .map(|_| if rng.gen::<f32>() < *p { 0.0 } else { keep_scale })
                        .collect();
                    let dropped: Vec<f32> =
                        weights.iter().zip(&dmask).map(|(w, m)| w * m).collect();
                    (dropped, Some(dmask))
                }
                _ => (weights.clone(), None),
            };

            let out_h = matmul_compute(&weights_used, &v_h, seq_len, seq_len, head_dim);
            write_head(&mut output, &out_h, seq_len, n_embed, h, head_dim);

            head_weights.push(weights);
            head_drop_masks.push(drop_mask);
        }
    }

    let requires_grad = q.requires_grad() || k.requires_grad() || v.requires_grad();
    let mut result = Tensor::new(Array1::from(output), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AttentionBackward {
            q: q.clone(),
            k: k.clone(),
            v: v.clone(),
            head_weights,
            head_drop_masks,
            seq_len,
            n_embed,
            n_head,
            head_dim,
            scale,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

/// Copy head `h`'s columns into a contiguous (seq_len × head_dim) buffer.
fn extract_head(
    data: &[f32],
    seq_len: usize,
    n_embed: usize,
    h: usize,
    head_dim: usize,
) -> Vec<f32> {
    let mut out = Vec::with_capacity(seq_len * head_dim);
    for s in 0..seq_len {
        let start = s * n_embed + h * head_dim;
        out.extend_from_slice(&data[start..start + head_dim]);
    }
    out
}

/// Scatter a contiguous head buffer back into full-width columns.
fn write_head(
    full: &mut [f32],
    head: &[f32],
    seq_len: usize,
    n_embed: usize,
    h: usize,
    head_dim: usize,
) {
    for s in 0..seq_len {
        let dst = s * n_embed + h * head_dim;
        let src = s * head_dim;
        full[dst..dst + head_dim].copy_from_slice(&head[src..src + head_dim]);
    }
}

/// Row-wise numerically stable softmax over a (rows × rows) score matrix.
fn softmax_rows(scores: &[f32], rows: usize) -> Vec<f32> {
    let mut weights = vec![0.0f32; scores.len()];
    for i in 0..rows {
        let row = &scores[i * rows..(i + 1) * rows];
        let max_val = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp_vals: Vec<f32> = row.iter().map(|&x| (x - max_val).exp()).collect();
        let sum_exp: f32 = exp_vals.iter().sum();
        for (j, &e) in exp_vals.iter().enumerate() {
            weights[i * rows + j] = e / sum_exp;
        }
    }
    weights
}

struct AttentionBackward {
    q: Tensor,
    k: Tensor,
    v: Tensor,
    head_weights: Vec<Vec<f32>>,
    head_drop_masks: Vec<Option<Vec<f32>>>,
    seq_len: usize,
    n_embed: usize,
    n_head: usize,
    head_dim: usize,
    scale: f32,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for AttentionBackward {
    fn backward(&self) {
        let grad_cell = self.result_grad.borrow();
        let Some(grad_output) = grad_cell.as_ref() else {
            return;
        };
        let grad_out = grad_output.as_slice().expect("gradient must be contiguous");

        let seq_len = self.seq_len;
        let head_dim = self.head_dim;

        let q_data = self.q.data();
        let k_data = self.k.data();
        let v_data = self.v.data();
        let q_slice = q_data.as_slice().expect("Q must be contiguous");
        let k_slice = k_data.as_slice().expect("K must be contiguous");
        let v_slice = v_data.as_slice().expect("V must be contiguous");

        let mut grad_q = vec![0.0f32; self.q.len()];
        let mut grad_k = vec![0.0f32; self.k.len()];
        let mut grad_v = vec![0.0f32; self.v.len()];

        for h in 0..self.n_head {
            let grad_out_h = extract_head(grad_out, seq_len, self.n_embed, h, head_dim);
            let q_h = extract_head(q_slice, seq_len, self.n_embed, h, head_dim);
            let k_h = extract_head(k_slice, seq_len, self.n_embed, h, head_dim);
            let v_h = extract_head(v_slice, seq_len, self.n_embed, h, head_dim);
            let weights = &self.head_weights[h];

            // the weights that multiplied V, after dropout if it was applied
            let weights_used: Vec<f32> = match &self.head_drop_masks[h] {
                Some(dmask) => weights.iter().zip(dmask).map(|(w, m)| w * m).collect(),
                None => weights.clone(),
            };

            // ∂L/∂V_h = W_used^T @ ∂L/∂out_h
            let w_t = transpose(&weights_used, seq_len, seq_len);
            let grad_v_h = matmul_compute(&w_t, &grad_out_h, seq_len, seq_len, head_dim);
            write_head(&mut grad_v, &grad_v_h, seq_len, self.n_embed, h, head_dim);

            // ∂L/∂W_used = ∂L/∂out_h @ V_h^T
            let v_t = transpose(&v_h, seq_len, head_dim);
            let mut grad_weights =
                matmul_compute(&grad_out_h, &v_t, seq_len, head_dim, seq_len);

            // back through dropout to the softmax output
            if let Some(dmask) = &self.head_drop_masks[h] {
                for (g, m) in grad_weights.iter_mut().zip(dmask) {
                    *g *= m;
                }
            }

            // softmax backward, row-wise; masked entries carry zero weight
            // and therefore zero gradient
            let mut grad_scores = vec![0.0f32; seq_len * seq_len];
            for i in 0..seq_len {
                let base = i * seq_len;
                let mut dot = 0.0f32;
                for kk in 0..seq_len {
                    dot += weights[base + kk] * grad_weights[base + kk];
                }
                for j in 0..seq_len {
                    grad_scores[base + j] =
                        weights[base + j] * (grad_weights[base + j] - dot) / self.scale;
                }
            }

            // ∂L/∂Q_h = grad_scores @ K_h, ∂L/∂K_h = grad_scores^T @ Q_h
            let grad_q_h = matmul_compute(&grad_scores, &k_h, seq_len, seq_len, head_dim);
            write_head(&mut grad_q, &grad_q_h, seq_len, self.n_embed, h, head_dim);

            let grad_t = transpose(&grad_scores, seq_len, seq_len);
            let grad_k_h = matmul_compute(&grad_t, &q_h, seq_len, seq_len, head_dim);
            write_head(&mut grad_k, &grad_k_h, seq_len, self.n_embed, h, head_dim);
        }

        drop(q_data);
        drop(k_data);
        drop(v_data);

        if self.q.requires_grad() {
            self.q.accumulate_grad(Array1::from(grad_q));
        }
        if self.k.requires_grad() {
            self.k.accumulate_grad(Array1::from(grad_k));
        }
        if self.v.requires_grad() {
            self.v.accumulate_grad(Array1::from(grad_v));
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.q.clone(), self.k.clone(), self.v.clone()]
    }
}
