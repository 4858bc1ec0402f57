//! Backward-op trait

use crate::autograd::Tensor;

/// Gradient computation recorded by an operation.
///
/// `backward` reads the accumulated gradient of the op's output and adds the
/// resulting contributions into the input gradients. It must not walk the
/// graph itself: [`crate::autograd::backward`] fires every op exactly once in
/// reverse topological order, after all consumers of its output have run.
/// Firing an op before its output gradient is complete would double-count
/// contributions wherever the graph re-joins (residual connections).
pub trait BackwardOp {
    /// Propagate the output gradient one step into the op's inputs.
    fn backward(&self);

    /// The input tensors of this op, used for graph traversal.
    fn inputs(&self) -> Vec<Tensor>;
}
