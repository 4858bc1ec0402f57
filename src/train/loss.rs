//! Loss functions

use crate::autograd::BackwardOp;
use crate::Tensor;
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Trait for loss functions.
pub trait LossFn {
    /// Compute the loss between predictions and targets.
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor;

    /// Loss function name.
    fn name(&self) -> &'static str;
}

/// Cross-entropy loss over one logit row with one-hot targets.
///
/// L = -Σ targets · log(softmax(predictions)), with the closed-form gradient
/// softmax(predictions) − targets flowing back into the logits.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Numerically stable softmax.
    pub(crate) fn softmax(x: &Array1<f32>) -> Array1<f32> {
        let max = x.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exp_x: Array1<f32> = x.mapv(|v| (v - max).exp());
        let sum: f32 = exp_x.sum();
        exp_x / sum
    }

    /// One-hot target row for a class index.
    pub fn one_hot(class: usize, len: usize) -> Tensor {
        let mut v = vec![0.0; len];
        v[class] = 1.0;
        Tensor::from_vec(v, false)
    }
}

impl LossFn for CrossEntropyLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "Predictions and targets must have same length"
        );

        let probs = Self::softmax(&predictions.data());
        let ce: f32 = targets
            .data()
            .iter()
            .zip(probs.iter())
            .map(|(&t, &p)| -t * (p + 1e-10).max(f32::MIN_POSITIVE).ln())
            .sum();

        let mut loss = Tensor::from_vec(vec![ce], predictions.requires_grad());

        if predictions.requires_grad() {
            let grad = &probs - &*targets.data();
            loss.set_backward_op(Rc::new(CrossEntropyBackward {
                predictions: predictions.clone(),
                grad,
                result_grad: loss.grad_cell(),
            }));
        }

        loss
    }

    fn name(&self) -> &'static str {
        "CrossEntropy"
    }
}

struct CrossEntropyBackward {
    predictions: Tensor,
    grad: Array1<f32>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for CrossEntropyBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            // the loss is scalar; scale the stored logit gradient by the
            // incoming gradient so loss averaging stays exact
            self.predictions.accumulate_grad(&self.grad * grad_output[0]);
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.predictions.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{backward, scale};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_loss_is_positive_and_finite() {
        let logits = Tensor::from_vec(vec![2.0, 1.0, 0.5], true);
        let targets = CrossEntropyLoss::one_hot(0, 3);
        let loss = CrossEntropyLoss.forward(&logits, &targets);
        assert!(loss.data()[0] > 0.0);
        assert!(loss.data()[0].is_finite());
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = CrossEntropyLoss::softmax(&ndarray::arr1(&[1.0, 2.0, 3.0]));
        assert_relative_eq!(probs.sum(), 1.0, epsilon = 1e-5);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_softmax_survives_large_logits() {
        let probs = CrossEntropyLoss::softmax(&ndarray::arr1(&[1000.0, 1001.0, 1002.0]));
        assert_relative_eq!(probs.sum(), 1.0, epsilon = 1e-5);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_uniform_logits_give_log_c() {
        for &classes in &[2usize, 3, 5, 10] {
            let logits = Tensor::from_vec(vec![1.0; classes], false);
            let targets = CrossEntropyLoss::one_hot(0, classes);
            let loss = CrossEntropyLoss.forward(&logits, &targets);
            assert_abs_diff_eq!(loss.data()[0], (classes as f32).ln(), epsilon = 1e-4);
        }
    }

    #[test]
    fn test_confident_correct_prediction_approaches_zero() {
        let logits = Tensor::from_vec(vec![50.0, -50.0, -50.0], false);
        let targets = CrossEntropyLoss::one_hot(0, 3);
        let loss = CrossEntropyLoss.forward(&logits, &targets);
        assert!(loss.data()[0] < 1e-3);
    }

    #[test]
    fn test_gradient_is_probs_minus_targets() {
        let logits = Tensor::from_vec(vec![2.0, 1.0, 0.5], true);
        let targets = CrossEntropyLoss::one_hot(0, 3);
        let mut loss = CrossEntropyLoss.forward(&logits, &targets);
        backward(&mut loss, None);

        let grad = logits.grad().unwrap();
        let probs = CrossEntropyLoss::softmax(&ndarray::arr1(&[2.0, 1.0, 0.5]));
        assert_abs_diff_eq!(grad[0], probs[0] - 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(grad[1], probs[1], epsilon = 1e-5);
        // target class pushes down, the rest push up
        assert!(grad[0] < 0.0);
    }

    #[test]
    fn test_gradient_respects_downstream_scaling() {
        // averaging over positions scales the logit gradient accordingly
        let logits = Tensor::from_vec(vec![2.0, 1.0], true);
        let targets = CrossEntropyLoss::one_hot(0, 2);
        let loss = CrossEntropyLoss.forward(&logits, &targets);
        let mut halved = scale(&loss, 0.5);
        backward(&mut halved, None);

        let grad = logits.grad().unwrap();
        let probs = CrossEntropyLoss::softmax(&ndarray::arr1(&[2.0, 1.0]));
        assert_abs_diff_eq!(grad[0], 0.5 * (probs[0] - 1.0), epsilon = 1e-5);
    }

    #[test]
    #[should_panic(expected = "must have same length")]
    fn test_mismatched_lengths_panic() {
        let pred = Tensor::from_vec(vec![1.0, 2.0], true);
        let target = Tensor::from_vec(vec![1.0, 0.0, 0.0], false);
        CrossEntropyLoss.forward(&pred, &target);
    }

    #[test]
    fn test_name() {
        assert_eq!(CrossEntropyLoss.name(), "CrossEntropy");
    }
}
