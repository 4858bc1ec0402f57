//! Gradient clipping

use crate::Tensor;

/// Clip gradients so their global L2 norm does not exceed `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_grad_norm(params: &mut [Tensor], max_norm: f32) -> f32 {
    let total_sq: f32 = params
        .iter()
        .filter_map(|p| p.grad())
        .map(|g| g.iter().map(|v| v * v).sum::<f32>())
        .sum();
    let total_norm = total_sq.sqrt();

    if total_norm > max_norm && total_norm > 0.0 {
        let scale = max_norm / total_norm;
        for param in params.iter_mut() {
            if let Some(grad) = param.grad() {
                param.set_grad(grad * scale);
            }
        }
    }

    total_norm
}
