//! Embedding-lookup autograd operation

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Gather embedding rows for a sequence of ids.
///
/// `weight` is a (rows × dim) table, flattened row-major; the output is
/// (ids.len() × dim), flattened. The backward pass scatters the output
/// gradient back into the gathered rows, so embedding tables actually learn.
pub fn embedding(weight: &Tensor, ids: &[u32], dim: usize) -> Tensor {
    let rows = weight.len() / dim;
    let data = {
        let table = weight.data();
        let table = table.as_slice().expect("embedding table must be contiguous");
        let mut out = Vec::with_capacity(ids.len() * dim);
        for &id in ids {
            let idx = id as usize;
            assert!(idx < rows, "embedding id {idx} outside table of {rows} rows");
            out.extend_from_slice(&table[idx * dim..(idx + 1) * dim]);
        }
        out
    };

    let requires_grad = weight.requires_grad();
    let mut result = Tensor::new(Array1::from(data), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(EmbeddingBackward {
            weight: weight.clone(),
            ids: ids.to_vec(),
            dim,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct EmbeddingBackward {
    weight: Tensor,
    ids: Vec<u32>,
    dim: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for EmbeddingBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.weight.requires_grad() {
                let grad = grad.as_slice().expect("gradient must be contiguous");
                let mut grad_w = Array1::zeros(self.weight.len());
                {
                    let grad_w = grad_w.as_slice_mut().expect("gradient buffer is contiguous");
                    for (pos, &id) in self.ids.iter().enumerate() {
                        let row = id as usize * self.dim;
                        for d in 0..self.dim {
                            // repeated ids accumulate into the same row
                            grad_w[row + d] += grad[pos * self.dim + d];
                        }
                    }
                }
                self.weight.accumulate_grad(grad_w);
            }
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.weight.clone()]
    }
}
