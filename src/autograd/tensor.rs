//! Gradient-tracking tensor
//!
//! A `Tensor` is a flat `f32` buffer with an optional gradient and a backward
//! op recorded by the operation that produced it. Clones share storage, so a
//! parameter handed to the optimizer and the same parameter inside a layer see
//! one buffer.

use crate::autograd::BackwardOp;
use ndarray::Array1;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// A 1-D tensor participating in the computational graph.
///
/// Matrices are stored flattened row-major; the ops that need a shape take it
/// as explicit dimensions.
#[derive(Clone)]
pub struct Tensor {
    data: Rc<RefCell<Array1<f32>>>,
    grad: Rc<RefCell<Option<Array1<f32>>>>,
    op: Rc<RefCell<Option<Rc<dyn BackwardOp>>>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a tensor from an ndarray buffer.
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        Self {
            data: Rc::new(RefCell::new(data)),
            grad: Rc::new(RefCell::new(None)),
            op: Rc::new(RefCell::new(None)),
            requires_grad,
        }
    }

    /// Create a tensor from a plain vector.
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    /// Zero-filled tensor of length `n`.
    pub fn zeros(n: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(n), requires_grad)
    }

    /// One-filled tensor of length `n`.
    pub fn ones(n: usize, requires_grad: bool) -> Self {
        Self::new(Array1::ones(n), requires_grad)
    }

    /// Borrow the underlying buffer.
    pub fn data(&self) -> Ref<'_, Array1<f32>> {
        self.data.borrow()
    }

    /// Mutably borrow the underlying buffer. Used by the optimizer step.
    pub fn data_mut(&self) -> RefMut<'_, Array1<f32>> {
        self.data.borrow_mut()
    }

    /// Copy the underlying buffer out as a vector.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.borrow().to_vec()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    /// True when the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether gradients are tracked through this tensor.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Current gradient, if any has been accumulated.
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Shared handle to the gradient cell, captured by backward ops.
    pub fn grad_cell(&self) -> Rc<RefCell<Option<Array1<f32>>>> {
        Rc::clone(&self.grad)
    }

    /// Overwrite the gradient.
    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Add `grad` into the accumulated gradient.
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut cell = self.grad.borrow_mut();
        match cell.as_mut() {
            Some(existing) => *existing += &grad,
            None => *cell = Some(grad),
        }
    }

    /// Clear the gradient.
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// The op that produced this tensor, if it is not a leaf.
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.op.borrow().clone()
    }

    /// Record the producing op. Called once by each operation.
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        *self.op.borrow_mut() = Some(op);
    }

    /// Stable identity of the graph node. Clones share it.
    pub fn node_id(&self) -> usize {
        Rc::as_ptr(&self.grad) as usize
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("len", &self.len())
            .field("requires_grad", &self.requires_grad)
            .field("has_grad", &self.grad.borrow().is_some())
            .finish()
    }
}
