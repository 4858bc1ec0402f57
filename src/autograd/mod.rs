//! Tape-based autograd engine
//!
//! Operations record a backward op on their output tensor; calling
//! [`backward`] seeds the output gradient and replays the recorded ops in
//! reverse topological order, firing each exactly once. The single-visit
//! sweep keeps gradients exact in graphs that re-join, which every residual
//! connection in the transformer does.

mod backward;
mod ops;
mod tensor;

pub use backward::BackwardOp;
pub use ops::*;
pub use tensor::Tensor;

use std::collections::HashSet;
use std::rc::Rc;

/// Perform a backward pass from `tensor`.
///
/// With `grad_output` of `None` the gradient is seeded with ones, the usual
/// choice for a scalar loss.
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    match grad_output {
        Some(grad) => tensor.set_grad(grad),
        None => tensor.set_grad(ndarray::Array1::ones(tensor.len())),
    }

    // Reverse postorder over the op DAG: consumers fire before producers, so
    // each op sees the complete gradient of its output.
    let mut visited = HashSet::new();
    let mut order: Vec<Rc<dyn BackwardOp>> = Vec::new();
    collect(tensor, &mut visited, &mut order);

    for op in order.iter().rev() {
        op.backward();
    }
}

fn collect(tensor: &Tensor, visited: &mut HashSet<usize>, order: &mut Vec<Rc<dyn BackwardOp>>) {
    if !visited.insert(tensor.node_id()) {
        return;
    }
    if let Some(op) = tensor.backward_op() {
        for input in op.inputs() {
            collect(&input, visited, order);
        }
        order.push(op);
    }
}
