//! Training-row construction
//!
//! Each task framing turns a (generator word, target permutation) pair into
//! one or more fixed-length (input, targets) rows. The framings form a closed
//! set behind one trait, selected once at startup; nothing branches on the
//! task mode at row-build time.

mod loader;
mod masked;
mod reversed;
mod simple;

pub use loader::{load_split, read_table, DataSplit};
pub use masked::MaskedBuilder;
pub use reversed::ReversedBuilder;
pub use simple::SimpleBuilder;

use crate::config::{TaskConfig, TaskMode};
use crate::error::{Error, Result};

/// One model-ready training row.
///
/// `targets` holds the class index (token id) for each position the framing
/// computes loss over: `group_size` entries for masked rows, `input_length`
/// for reversed rows, exactly one for simple rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    /// Input token sequence.
    pub input: Vec<u32>,
    /// Target token per predicted position.
    pub targets: Vec<u32>,
}

/// A task framing's row constructor.
pub trait RowBuilder {
    /// Build the rows for one example. Fails fast on any length or range
    /// disagreement with the configuration, before any row is produced.
    fn build(&self, word: &[usize], perm: &[usize]) -> Result<Vec<TaskRow>>;
}

/// Select the row builder for the configured task framing.
pub fn builder_for(config: &TaskConfig) -> Box<dyn RowBuilder> {
    match config.mode {
        TaskMode::Simple => Box::new(SimpleBuilder::new(config)),
        TaskMode::Masked => Box::new(MaskedBuilder::new(config)),
        TaskMode::Reversed => Box::new(ReversedBuilder::new(config)),
    }
}

/// Build all rows for aligned word and permutation tables.
pub fn build_rows(
    builder: &dyn RowBuilder,
    words: &[Vec<usize>],
    perms: &[Vec<usize>],
) -> Result<Vec<TaskRow>> {
    if words.len() != perms.len() {
        return Err(Error::config_mismatch(format!(
            "word table has {} rows but permutation table has {}",
            words.len(),
            perms.len()
        )));
    }
    let mut rows = Vec::with_capacity(words.len());
    for (word, perm) in words.iter().zip(perms) {
        rows.extend(builder.build(word, perm)?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;

    #[test]
    fn test_builder_for_selects_by_mode() {
        let mut config = TaskConfig::tiny();

        config.mode = TaskMode::Masked;
        let rows =
            builder_for(&config).build(&[1, 2], &[0, 2, 1, 3]).unwrap();
        assert_eq!(rows.len(), 1);

        config.mode = TaskMode::Simple;
        let rows =
            builder_for(&config).build(&[1, 2], &[0, 2, 1, 3]).unwrap();
        assert_eq!(rows.len(), config.group_size);

        config.mode = TaskMode::Reversed;
        let rows =
            builder_for(&config).build(&[1, 2], &[0, 2, 1, 3]).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_build_rows_rejects_misaligned_tables() {
        let config = TaskConfig::tiny();
        let builder = builder_for(&config);
        let words = vec![vec![1, 2], vec![2, 1]];
        let perms = vec![vec![0, 2, 1, 3]];
        assert!(build_rows(builder.as_ref(), &words, &perms).is_err());
    }

    #[test]
    fn test_build_rows_flattens_examples() {
        let config = TaskConfig::tiny();
        let builder = builder_for(&config);
        let words = vec![vec![1], vec![2]];
        let perms = vec![vec![1, 0, 2, 3], vec![0, 2, 1, 3]];
        let rows = build_rows(builder.as_ref(), &words, &perms).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
