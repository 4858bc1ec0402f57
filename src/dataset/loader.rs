//! Dataset table loading
//!
//! The tables are plain comma-delimited integers, one example per row. The
//! training split may be sharded across `train_data1.csv`, `train_data2.csv`,
//! … with aligned `train_dataN_perms.csv` files; shards are consumed while
//! the next file exists. Validation and test splits are single files and
//! required.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// The three dataset partitions with their aligned permutation tables.
pub struct DataSplit {
    pub train_words: Vec<Vec<usize>>,
    pub train_perms: Vec<Vec<usize>>,
    pub val_words: Vec<Vec<usize>>,
    pub val_perms: Vec<Vec<usize>>,
    pub test_words: Vec<Vec<usize>>,
    pub test_perms: Vec<Vec<usize>>,
}

/// Read one comma-delimited integer table.
pub fn read_table(path: impl AsRef<Path>) -> Result<Vec<Vec<usize>>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading table {}", path.display()), e))?;

    let mut rows = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: Result<Vec<usize>> = line
            .split(',')
            .map(|cell| {
                cell.trim().parse::<usize>().map_err(|e| Error::Csv {
                    path: PathBuf::from(path),
                    line: line_no + 1,
                    message: format!("'{}': {e}", cell.trim()),
                })
            })
            .collect();
        rows.push(row?);
    }
    Ok(rows)
}

fn read_aligned(
    words_path: &Path,
    perms_path: &Path,
) -> Result<(Vec<Vec<usize>>, Vec<Vec<usize>>)> {
    let words = read_table(words_path)?;
    let perms = read_table(perms_path)?;
    if words.len() != perms.len() {
        return Err(Error::config_mismatch(format!(
            "{} has {} rows but {} has {}",
            words_path.display(),
            words.len(),
            perms_path.display(),
            perms.len()
        )));
    }
    Ok((words, perms))
}

/// Load all partitions from a dataset directory.
pub fn load_split(data_dir: impl AsRef<Path>) -> Result<DataSplit> {
    let dir = data_dir.as_ref();

    let mut train_words = Vec::new();
    let mut train_perms = Vec::new();
    let mut shard = 1;
    loop {
        let words_path = dir.join(format!("train_data{shard}.csv"));
        if !words_path.is_file() {
            break;
        }
        let perms_path = dir.join(format!("train_data{shard}_perms.csv"));
        let (words, perms) = read_aligned(&words_path, &perms_path)?;
        train_words.extend(words);
        train_perms.extend(perms);
        shard += 1;
    }

    let (val_words, val_perms) =
        read_aligned(&dir.join("val_data.csv"), &dir.join("val_data_perms.csv"))?;
    let (test_words, test_perms) =
        read_aligned(&dir.join("test_data.csv"), &dir.join("test_data_perms.csv"))?;

    Ok(DataSplit { train_words, train_perms, val_words, val_perms, test_words, test_perms })
}
