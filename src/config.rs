//! Task configuration
//!
//! One immutable [`TaskConfig`] struct is constructed at startup (usually from
//! a YAML file) and passed by reference to every component constructor. All
//! vocabulary quantities are derived from it; nothing reads global state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a generator symbol maps onto a transposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranspositionScheme {
    /// Symbol `i` (1 ≤ i < G) swaps adjacent positions `i-1` and `i`.
    Elementary,
    /// Symbol `i` (1 ≤ i < G²) swaps positions `i / G` and `i % G`.
    General,
}

/// Task framing, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    /// One training row per autoregression step; no structural mask.
    Simple,
    /// One row per example, trained under the structural attention mask.
    Masked,
    /// Predict the word from the permutation (inverse problem).
    Reversed,
}

/// Immutable configuration for a training/evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Size of the permutation group (G).
    pub group_size: usize,
    /// Maximum generator-word length, in tokens.
    pub input_length: usize,
    /// Transposition scheme for generator symbols.
    pub scheme: TranspositionScheme,
    /// Task framing.
    pub mode: TaskMode,
    /// Reserve the deprecated END_PREDICTION token. Only needed to stay
    /// vocabulary-compatible with historical checkpoints.
    #[serde(default)]
    pub legacy_end_token: bool,

    /// Embedding width.
    pub n_embed: usize,
    /// Attention head count. Must divide `n_embed`.
    pub n_head: usize,
    /// Number of transformer blocks.
    pub n_blocks: usize,
    /// Dropout rate for attention weights and feed-forward outputs.
    pub dropout: f32,

    /// AdamW learning rate.
    pub learning_rate: f32,
    /// AdamW decoupled weight decay.
    pub weight_decay: f32,
    /// Optional global gradient-norm clip.
    #[serde(default)]
    pub max_grad_norm: Option<f32>,
    /// Rows per optimizer step.
    pub batch_size: usize,
    /// Number of training epochs.
    pub num_epochs: usize,
    /// Factor by which the learning rate is reduced on plateau.
    pub lr_factor: f32,
    /// Epochs without improvement before the learning rate is reduced.
    pub lr_patience: usize,
    /// Threshold for measuring a new optimum.
    pub lr_threshold: f32,
    /// RNG seed for parameter init, shuffling and dropout.
    pub seed: u64,

    /// Directory holding the CSV dataset tables.
    pub data_dir: String,
    /// Directory holding model checkpoints.
    pub model_dir: String,
    /// Directory the per-example test results are appended to.
    pub results_dir: String,
    /// Checkpoint key: the model is persisted as `<model_dir>/<model_name>.json`.
    pub model_name: String,
}

impl TaskConfig {
    /// Number of transposition-token symbols (including the identity 0).
    pub fn num_trans(&self) -> usize {
        match self.scheme {
            TranspositionScheme::Elementary => self.group_size,
            TranspositionScheme::General => self.group_size * self.group_size,
        }
    }

    /// One past the last permutation token; specials start here.
    pub fn num_normal(&self) -> usize {
        self.num_trans() + self.group_size
    }

    /// Total vocabulary size. Transposition, permutation and special ranges
    /// partition `[0, vocab_size)` exactly.
    pub fn vocab_size(&self) -> usize {
        self.num_normal() + 2 + usize::from(self.legacy_end_token)
    }

    /// Marks the boundary between the known region and the prediction region.
    pub fn start_prediction_token(&self) -> u32 {
        self.num_normal() as u32
    }

    /// Padding token.
    pub fn null_token(&self) -> u32 {
        (self.num_normal() + 1) as u32
    }

    /// Deprecated end-of-prediction marker, present only with
    /// `legacy_end_token`.
    pub fn end_prediction_token(&self) -> Option<u32> {
        self.legacy_end_token.then(|| (self.num_normal() + 2) as u32)
    }

    /// Fixed context window: word region + START + prediction region.
    pub fn context_length(&self) -> usize {
        self.input_length + 1 + self.group_size
    }

    /// Validate internal consistency. Called by every component constructor
    /// that derives sizes from the config.
    pub fn validate(&self) -> Result<()> {
        if self.group_size < 2 {
            return Err(Error::ConfigValue {
                field: "group_size".to_string(),
                message: format!("must be at least 2, got {}", self.group_size),
            });
        }
        if self.input_length == 0 {
            return Err(Error::ConfigValue {
                field: "input_length".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.n_head == 0 || self.n_embed % self.n_head != 0 {
            return Err(Error::ConfigValue {
                field: "n_head".to_string(),
                message: format!("{} must divide n_embed {}", self.n_head, self.n_embed),
            });
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::ConfigValue {
                field: "dropout".to_string(),
                message: format!("must be in [0, 1), got {}", self.dropout),
            });
        }
        if self.batch_size == 0 {
            return Err(Error::ConfigValue {
                field: "batch_size".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Load and validate a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;
        let config: TaskConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::Serialization { message: format!("config parse failed: {e}") })?;
        config.validate()?;
        Ok(config)
    }

    /// Small configuration used throughout the test suite.
    pub fn tiny() -> Self {
        Self {
            group_size: 4,
            input_length: 6,
            scheme: TranspositionScheme::Elementary,
            mode: TaskMode::Masked,
            legacy_end_token: false,
            n_embed: 16,
            n_head: 2,
            n_blocks: 2,
            dropout: 0.0,
            learning_rate: 3e-4,
            weight_decay: 0.01,
            max_grad_norm: None,
            batch_size: 4,
            num_epochs: 2,
            lr_factor: 0.1,
            lr_patience: 10,
            lr_threshold: 0.01,
            seed: 42,
            data_dir: "data".to_string(),
            model_dir: "model".to_string(),
            results_dir: "results".to_string(),
            model_name: "tiny".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocab_partition_elementary() {
        let config = TaskConfig::tiny();
        assert_eq!(config.num_trans(), 4);
        assert_eq!(config.num_normal(), 8);
        assert_eq!(config.vocab_size(), 10);
        assert_eq!(config.start_prediction_token(), 8);
        assert_eq!(config.null_token(), 9);
        assert_eq!(config.end_prediction_token(), None);
    }

    #[test]
    fn test_vocab_partition_general() {
        let mut config = TaskConfig::tiny();
        config.scheme = TranspositionScheme::General;
        assert_eq!(config.num_trans(), 16);
        assert_eq!(config.num_normal(), 20);
        assert_eq!(config.vocab_size(), 22);
    }

    #[test]
    fn test_legacy_end_token_extends_vocab() {
        let mut config = TaskConfig::tiny();
        config.legacy_end_token = true;
        assert_eq!(config.vocab_size(), 11);
        assert_eq!(config.end_prediction_token(), Some(10));
    }

    #[test]
    fn test_context_length() {
        let config = TaskConfig::tiny();
        // word region + START + prediction region
        assert_eq!(config.context_length(), 6 + 1 + 4);
    }

    #[test]
    fn test_validate_rejects_bad_head_count() {
        let mut config = TaskConfig::tiny();
        config.n_head = 3; // does not divide n_embed = 16
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_tiny_group() {
        let mut config = TaskConfig::tiny();
        config.group_size = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dropout_of_one() {
        let mut config = TaskConfig::tiny();
        config.dropout = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = TaskConfig::tiny();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let restored: TaskConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(restored.group_size, config.group_size);
        assert_eq!(restored.scheme, config.scheme);
        assert_eq!(restored.mode, config.mode);
        assert_eq!(restored.model_name, config.model_name);
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        let yaml = serde_yaml::to_string(&TaskMode::Masked).unwrap();
        assert!(yaml.contains("masked"));
        let yaml = serde_yaml::to_string(&TranspositionScheme::General).unwrap();
        assert!(yaml.contains("general"));
    }

    #[test]
    fn test_from_yaml_file_missing() {
        let result = TaskConfig::from_yaml_file("/nonexistent/config.yaml");
        assert!(result.is_err());
    }
}
