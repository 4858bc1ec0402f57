//! Test-set evaluation
//!
//! Runs constrained generation over the test split, compares against the
//! ground-truth table and appends one pass/fail line per example to the
//! results file for downstream analysis.

use crate::config::{TaskConfig, TaskMode};
use crate::error::{Error, Result};
use crate::generate::Generator;
use crate::group;
use crate::model::Transformer;
use std::io::Write;
use std::path::PathBuf;

/// Path of the per-example results file for a model name.
pub fn results_path(config: &TaskConfig) -> PathBuf {
    PathBuf::from(&config.results_dir).join(format!("{}.csv", config.model_name))
}

/// Evaluate the model over the test split and return the exact-match
/// accuracy.
///
/// Forward framings compare the generated permutation with the table entry;
/// the reversed framing checks that the generated word evaluates to the
/// example's permutation. Outcomes are appended to the results file, one
/// `0`/`1` per line.
pub fn run_test(
    config: &TaskConfig,
    model: &Transformer,
    words: &[Vec<usize>],
    perms: &[Vec<usize>],
) -> Result<f32> {
    if words.len() != perms.len() {
        return Err(Error::config_mismatch(format!(
            "test split has {} words but {} permutations",
            words.len(),
            perms.len()
        )));
    }

    let generator = Generator::new(model, config);
    let mut results: Vec<bool> = Vec::with_capacity(words.len());

    for (word, expected) in words.iter().zip(perms) {
        let passed = match config.mode {
            TaskMode::Reversed => {
                let generated = generator.generate_word(expected)?;
                group::evaluate(&generated, config.group_size, config.scheme)? == *expected
            }
            TaskMode::Simple | TaskMode::Masked => generator.generate(word)? == *expected,
        };
        results.push(passed);
    }

    let accuracy = if results.is_empty() {
        0.0
    } else {
        results.iter().filter(|&&r| r).count() as f32 / results.len() as f32
    };
    println!("Accuracy: {accuracy}");

    append_results(config, &results)?;
    Ok(accuracy)
}

fn append_results(config: &TaskConfig, results: &[bool]) -> Result<()> {
    std::fs::create_dir_all(&config.results_dir)
        .map_err(|e| Error::io(format!("creating results dir {}", config.results_dir), e))?;
    let path = results_path(config);

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| Error::io(format!("opening {}", path.display()), e))?;

    for &passed in results {
        writeln!(file, "{}", u8::from(passed))
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> TaskConfig {
        let mut config = TaskConfig::tiny();
        config.results_dir = dir.path().join("results").to_string_lossy().into_owned();
        config
    }

    fn tiny_examples(config: &TaskConfig) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let words: Vec<Vec<usize>> = vec![vec![1], vec![2, 1], vec![0, 0]];
        let perms = words
            .iter()
            .map(|w| group::evaluate(w, config.group_size, config.scheme).unwrap())
            .collect();
        (words, perms)
    }

    #[test]
    fn test_run_test_writes_one_line_per_example() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let model = Transformer::new(&config);
        let (words, perms) = tiny_examples(&config);

        let accuracy = run_test(&config, &model, &words, &perms).unwrap();
        assert!((0.0..=1.0).contains(&accuracy));

        let content = std::fs::read_to_string(results_path(&config)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), words.len());
        assert!(lines.iter().all(|l| *l == "0" || *l == "1"));
    }

    #[test]
    fn test_repeated_runs_append() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let model = Transformer::new(&config);
        let (words, perms) = tiny_examples(&config);

        run_test(&config, &model, &words, &perms).unwrap();
        run_test(&config, &model, &words, &perms).unwrap();

        let content = std::fs::read_to_string(results_path(&config)).unwrap();
        assert_eq!(content.lines().count(), 2 * words.len());
    }

    #[test]
    fn test_misaligned_tables_rejected() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let model = Transformer::new(&config);
        let result = run_test(&config, &model, &[vec![1]], &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_reversed_mode_checks_by_evaluation() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.mode = TaskMode::Reversed;
        let model = Transformer::new(&config);
        let (words, perms) = tiny_examples(&config);

        let accuracy = run_test(&config, &model, &words, &perms).unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
    }
}
