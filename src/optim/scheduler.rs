//! Learning rate scheduling

use super::Optimizer;

/// Reduce the learning rate when a monitored metric stops improving.
///
/// After `patience` consecutive epochs without the metric improving by more
/// than `threshold`, the learning rate is multiplied by `factor`. Mirrors
/// the plateau schedule the training recipe was tuned with (min mode).
pub struct ReduceOnPlateau {
    lr: f32,
    factor: f32,
    patience: usize,
    threshold: f32,
    best: Option<f32>,
    stale_epochs: usize,
}

impl ReduceOnPlateau {
    /// Create a plateau scheduler starting from `lr`.
    pub fn new(lr: f32, factor: f32, patience: usize, threshold: f32) -> Self {
        Self { lr, factor, patience, threshold, best: None, stale_epochs: 0 }
    }

    /// Record one epoch's metric. Returns `true` when the learning rate was
    /// reduced this step.
    pub fn step(&mut self, metric: f32) -> bool {
        let improved = match self.best {
            Some(best) => metric < best - self.threshold,
            None => true,
        };

        if improved {
            self.best = Some(metric);
            self.stale_epochs = 0;
            return false;
        }

        self.stale_epochs += 1;
        if self.stale_epochs > self.patience {
            self.lr *= self.factor;
            self.stale_epochs = 0;
            return true;
        }
        false
    }

    /// Current learning rate.
    pub fn lr(&self) -> f32 {
        self.lr
    }

    /// Push the current learning rate into an optimizer.
    pub fn apply<O: Optimizer>(&self, optimizer: &mut O) {
        optimizer.set_lr(self.lr);
    }
}
