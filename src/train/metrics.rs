//! Per-epoch training metrics

/// Index of the largest logit in a row.
pub fn argmax(row: &[f32]) -> usize {
    row.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .expect("argmax of an empty row")
}

/// Globally aggregated prediction counts for one pass over a split.
///
/// Accuracy is computed from summed hit/position totals rather than averaged
/// per-batch means, so the value stays exact when batches are uneven and when
/// counts are gathered across workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassTotals {
    /// Sum of per-row losses.
    pub loss_sum: f32,
    /// Number of rows contributing to `loss_sum`.
    pub rows: usize,
    /// Correctly predicted positions.
    pub hits: usize,
    /// Total predicted positions.
    pub positions: usize,
}

impl PassTotals {
    /// Fold one row's results in.
    pub fn record(&mut self, loss: f32, hits: usize, positions: usize) {
        self.loss_sum += loss;
        self.rows += 1;
        self.hits += hits;
        self.positions += positions;
    }

    /// Mean loss per row.
    pub fn mean_loss(&self) -> f32 {
        if self.rows == 0 {
            0.0
        } else {
            self.loss_sum / self.rows as f32
        }
    }

    /// Position-level accuracy.
    pub fn accuracy(&self) -> f32 {
        if self.positions == 0 {
            0.0
        } else {
            self.hits as f32 / self.positions as f32
        }
    }
}

/// Scalar metrics reported after every epoch.
#[derive(Debug, Clone)]
pub struct EpochMetrics {
    /// Zero-based epoch index.
    pub epoch: usize,
    pub train_loss: f32,
    pub train_accuracy: f32,
    pub val_loss: f32,
    pub val_accuracy: f32,
    /// Loss change vs the previous epoch; absent on the first.
    pub delta_train_loss: Option<f32>,
    pub delta_val_loss: Option<f32>,
    /// Learning rate in effect during the epoch.
    pub lr: f32,
}
