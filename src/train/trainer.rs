//! Epoch-level training loop
//!
//! Each epoch runs gradient-accumulated batches over the shuffled training
//! rows, then a no-grad validation pass, prints the epoch line, saves a
//! checkpoint and steps the plateau scheduler on the train loss. A crashed
//! run is resumed manually from the last successfully written checkpoint;
//! epochs are never replayed automatically.

use crate::autograd::{self, add, narrow, scale, Tensor};
use crate::config::TaskConfig;
use crate::dataset::{build_rows, builder_for, DataSplit, TaskRow};
use crate::error::Result;
use crate::io::{load_checkpoint, save_checkpoint};
use crate::model::Transformer;
use crate::optim::{clip_grad_norm, AdamW, Optimizer, ReduceOnPlateau};
use crate::train::loss::{CrossEntropyLoss, LossFn};
use crate::train::metrics::{argmax, EpochMetrics, PassTotals};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Orchestrates training for one configuration.
pub struct Trainer {
    config: TaskConfig,
    pub model: Transformer,
    params: Vec<Tensor>,
    optimizer: AdamW,
    scheduler: ReduceOnPlateau,
    loss_fn: CrossEntropyLoss,
    rng: StdRng,
}

impl Trainer {
    /// Build a trainer, resuming from the configured checkpoint when one
    /// exists. A missing checkpoint is tolerated: the model starts from
    /// fresh seeded parameters with a visible warning.
    pub fn new(config: &TaskConfig) -> Result<Self> {
        config.validate()?;
        let mut model = Transformer::new(config);

        match load_checkpoint(&config.model_dir, &config.model_name)? {
            Some(checkpoint) => {
                model.load_parameters(&checkpoint)?;
                println!("Resumed model '{}' from checkpoint", config.model_name);
            }
            None => {
                eprintln!(
                    "Warning: no checkpoint for '{}' in {}, starting from fresh parameters",
                    config.model_name, config.model_dir
                );
            }
        }

        let params = model.parameters();
        let optimizer = AdamW::default_params(config.learning_rate, config.weight_decay);
        let scheduler = ReduceOnPlateau::new(
            config.learning_rate,
            config.lr_factor,
            config.lr_patience,
            config.lr_threshold,
        );

        Ok(Self {
            config: config.clone(),
            model,
            params,
            optimizer,
            scheduler,
            loss_fn: CrossEntropyLoss,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Train for the configured number of epochs and return the metric
    /// history.
    pub fn train(&mut self, split: &DataSplit) -> Result<Vec<EpochMetrics>> {
        let builder = builder_for(&self.config);
        let train_rows = build_rows(builder.as_ref(), &split.train_words, &split.train_perms)?;
        let val_rows = build_rows(builder.as_ref(), &split.val_words, &split.val_perms)?;
        println!(
            "Training on {} rows, validating on {} rows ({} parameters)",
            train_rows.len(),
            val_rows.len(),
            self.model.num_parameters()
        );

        let mut history: Vec<EpochMetrics> = Vec::with_capacity(self.config.num_epochs);
        let mut last: Option<(f32, f32)> = None;

        for epoch in 0..self.config.num_epochs {
            let train = self.run_pass(&train_rows, true)?;
            let val = self.run_pass(&val_rows, false)?;

            let metrics = EpochMetrics {
                epoch,
                train_loss: train.mean_loss(),
                train_accuracy: train.accuracy(),
                val_loss: val.mean_loss(),
                val_accuracy: val.accuracy(),
                delta_train_loss: last.map(|(t, _)| train.mean_loss() - t),
                delta_val_loss: last.map(|(_, v)| val.mean_loss() - v),
                lr: self.optimizer.lr(),
            };
            last = Some((metrics.train_loss, metrics.val_loss));

            println!(
                "Epoch {}, Train loss {:.6} Train Accuracy {:.4} Validation Accuracy: {:.4}, Val loss: {:.6}",
                epoch + 1,
                metrics.train_loss,
                metrics.train_accuracy,
                metrics.val_accuracy,
                metrics.val_loss
            );

            // the parameter state is fully materialized after every epoch
            let checkpoint = self.model.to_checkpoint(&self.config.model_name);
            save_checkpoint(&checkpoint, &self.config.model_dir, &self.config.model_name)?;

            if self.scheduler.step(metrics.train_loss) {
                self.scheduler.apply(&mut self.optimizer);
                println!("Reducing learning rate to {:e}", self.optimizer.lr());
            }

            history.push(metrics);
        }

        Ok(history)
    }

    /// One pass over a row set; gradients and optimizer steps only when
    /// `training`.
    fn run_pass(&mut self, rows: &[TaskRow], training: bool) -> Result<PassTotals> {
        let mut totals = PassTotals::default();

        if training {
            let mut indices: Vec<usize> = (0..rows.len()).collect();
            indices.shuffle(&mut self.rng);

            for batch in indices.chunks(self.config.batch_size) {
                self.optimizer.zero_grad(&mut self.params);
                for &idx in batch {
                    let (loss, hits, positions) = self.forward_row(&rows[idx], true);
                    totals.record(loss, hits, positions);
                }
                if let Some(max_norm) = self.config.max_grad_norm {
                    clip_grad_norm(&mut self.params, max_norm);
                }
                self.optimizer.step(&mut self.params);
            }
        } else {
            for row in rows {
                let (loss, hits, positions) = self.forward_row(row, false);
                totals.record(loss, hits, positions);
            }
        }

        Ok(totals)
    }

    /// Forward one row, returning (loss, correct positions, total positions).
    /// In training mode the backward pass leaves gradients accumulated on
    /// the parameters.
    fn forward_row(&mut self, row: &TaskRow, training: bool) -> (f32, usize, usize) {
        let seq_len = row.input.len();
        let logits = if training {
            self.model.forward_train(&row.input, &mut self.rng)
        } else {
            self.model.forward(&row.input)
        };
        let region = self.model.training_logits(&logits, seq_len);

        let vocab = self.model.vocab_size();
        let positions = row.targets.len();
        debug_assert_eq!(region.len(), positions * vocab);

        let mut hits = 0;
        let mut loss_acc: Option<Tensor> = None;
        for (pos, &target) in row.targets.iter().enumerate() {
            let row_logits = narrow(&region, pos * vocab, vocab);
            if argmax(&row_logits.to_vec()) == target as usize {
                hits += 1;
            }
            let one_hot = CrossEntropyLoss::one_hot(target as usize, vocab);
            let loss = self.loss_fn.forward(&row_logits, &one_hot);
            loss_acc = Some(match loss_acc {
                Some(acc) => add(&acc, &loss),
                None => loss,
            });
        }

        let mut loss = scale(&loss_acc.expect("at least one target position"), 1.0 / positions as f32);
        let loss_value = loss.data()[0];
        if training {
            autograd::backward(&mut loss, None);
        }
        (loss_value, hits, positions)
    }

    /// Learning rate currently in effect.
    pub fn lr(&self) -> f32 {
        self.optimizer.lr()
    }
}
