//! AdamW optimizer (Adam with decoupled weight decay)

use super::Optimizer;
use crate::Tensor;
use ndarray::Array1;

/// AdamW optimizer.
///
/// Weight decay is applied directly to the parameters instead of being mixed
/// into the gradient:
///
/// θ_t = (1 - lr·λ) · θ_{t-1} - lr_t · m̂_t / (√v̂_t + ε)
pub struct AdamW {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>,
    v: Vec<Option<Array1<f32>>>,
}

impl AdamW {
    /// Create a new AdamW optimizer.
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32, weight_decay: f32) -> Self {
        Self { lr, beta1, beta2, epsilon, weight_decay, t: 0, m: Vec::new(), v: Vec::new() }
    }

    /// AdamW with the usual betas and epsilon.
    pub fn default_params(lr: f32, weight_decay: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8, weight_decay)
    }

    /// Step counter, for inspection.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }

    fn ensure_moments(&mut self, count: usize) {
        if self.m.len() < count {
            self.m.resize(count, None);
            self.v.resize(count, None);
        }
    }
}

impl Optimizer for AdamW {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_moments(params.len());
        self.t += 1;

        // bias-corrected step size
        let lr_t = self.lr
            * ((1.0 - self.beta2.powi(self.t as i32)).sqrt()
                / (1.0 - self.beta1.powi(self.t as i32)));

        for (i, param) in params.iter_mut().enumerate() {
            if let Some(grad) = param.grad() {
                // m_t = β1·m + (1-β1)·g
                let m_t = match &self.m[i] {
                    Some(m) => m * self.beta1 + &grad * (1.0 - self.beta1),
                    None => &grad * (1.0 - self.beta1),
                };

                // v_t = β2·v + (1-β2)·g²
                let grad_sq = &grad * &grad;
                let v_t = match &self.v[i] {
                    Some(v) => v * self.beta2 + &grad_sq * (1.0 - self.beta2),
                    None => &grad_sq * (1.0 - self.beta2),
                };

                let adaptive = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;
                let decay_factor = 1.0 - self.lr * self.weight_decay;
                let updated = &*param.data() * decay_factor - &adaptive;
                *param.data_mut() = updated;

                self.m[i] = Some(m_t);
                self.v[i] = Some(v_t);
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_quadratic_convergence() {
        // f(x) = x², gradient 2x
        let mut params = vec![Tensor::from_vec(vec![5.0, -3.0, 2.0], true)];
        let mut optimizer = AdamW::default_params(0.1, 0.0);

        for _ in 0..100 {
            let grad = params[0].data().mapv(|x| 2.0 * x);
            params[0].set_grad(grad);
            optimizer.step(&mut params);
        }

        for &val in params[0].data().iter() {
            assert!(val.abs() < 0.5, "value {val} did not converge");
        }
    }

    #[test]
    fn test_zero_gradient_applies_only_weight_decay() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        let mut optimizer = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.1);

        params[0].set_grad(ndarray::arr1(&[0.0]));
        optimizer.step(&mut params);

        // θ = (1 - lr·λ)·θ = 0.99
        assert_abs_diff_eq!(params[0].data()[0], 0.99, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_decay_and_zero_gradient_is_a_noop() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        let mut optimizer = AdamW::new(0.1, 0.9, 0.999, 1e-8, 0.0);
        params[0].set_grad(ndarray::arr1(&[0.0]));
        optimizer.step(&mut params);
        assert_abs_diff_eq!(params[0].data()[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_weight_decay_shrinks_parameters() {
        let mut with_decay = vec![Tensor::from_vec(vec![2.0, -2.0], true)];
        let mut without = vec![Tensor::from_vec(vec![2.0, -2.0], true)];
        let mut opt_decay = AdamW::default_params(0.1, 0.1);
        let mut opt_plain = AdamW::default_params(0.1, 0.0);

        for _ in 0..10 {
            let grad = ndarray::arr1(&[1.0, -1.0]);
            with_decay[0].set_grad(grad.clone());
            without[0].set_grad(grad);
            opt_decay.step(&mut with_decay);
            opt_plain.step(&mut without);
        }

        assert!(with_decay[0].data()[0].abs() < without[0].data()[0].abs());
        assert!(with_decay[0].data()[1].abs() < without[0].data()[1].abs());
    }

    #[test]
    fn test_multiple_params_all_update() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0, 2.0], true),
            Tensor::from_vec(vec![3.0, 4.0], true),
        ];
        let mut optimizer = AdamW::default_params(0.1, 0.01);
        params[0].set_grad(ndarray::arr1(&[0.1, 0.2]));
        params[1].set_grad(ndarray::arr1(&[0.3, 0.4]));
        optimizer.step(&mut params);
        assert!(params[0].data()[0] < 1.0);
        assert!(params[1].data()[0] < 3.0);
    }

    #[test]
    fn test_no_grad_param_unchanged() {
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0], false)];
        let mut optimizer = AdamW::default_params(0.1, 0.01);
        optimizer.step(&mut params);
        assert_eq!(params[0].to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_extreme_values_stay_finite() {
        let mut params = vec![Tensor::from_vec(vec![1e6, -1e6, 1e-6, -1e-6], true)];
        let mut optimizer = AdamW::default_params(0.001, 0.01);
        let grad = params[0].data().mapv(|x| 2.0 * x);
        params[0].set_grad(grad);
        optimizer.step(&mut params);
        for &val in params[0].data().iter() {
            assert!(val.is_finite());
        }
    }

    #[test]
    fn test_step_count_increments() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        let mut optimizer = AdamW::default_params(0.1, 0.0);
        assert_eq!(optimizer.step_count(), 0);
        params[0].set_grad(ndarray::arr1(&[1.0]));
        optimizer.step(&mut params);
        assert_eq!(optimizer.step_count(), 1);
    }
}
