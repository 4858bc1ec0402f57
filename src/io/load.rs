//! Checkpoint loading

use super::model::{Model, ModelState};
use super::save::checkpoint_path;
use crate::error::{Error, Result};
use std::path::Path;

/// Load a model checkpoint by name.
///
/// Returns `Ok(None)` when no checkpoint exists: a missing checkpoint is
/// tolerated; the caller logs a warning and starts from fresh parameters.
/// A present but unreadable checkpoint is an error.
pub fn load_checkpoint(dir: impl AsRef<Path>, name: &str) -> Result<Option<Model>> {
    let path = checkpoint_path(dir, name);
    if !path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
    let state: ModelState = serde_json::from_str(&content)
        .map_err(|e| Error::Serialization { message: format!("checkpoint decode failed: {e}") })?;

    Ok(Some(Model::from_state(state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{save_checkpoint, ModelMetadata};
    use crate::Tensor;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_missing_checkpoint_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = load_checkpoint(dir.path(), "absent").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let model = Model::new(
            ModelMetadata::new("rt", "transformer"),
            vec![
                ("a".to_string(), Tensor::from_vec(vec![1.5, -2.5], true)),
                ("b".to_string(), Tensor::from_vec(vec![0.0], false)),
            ],
        );
        save_checkpoint(&model, dir.path(), "rt").unwrap();

        let loaded = load_checkpoint(dir.path(), "rt").unwrap().unwrap();
        assert_eq!(loaded.metadata.name, "rt");
        assert_eq!(loaded.get_parameter("a").unwrap().to_vec(), vec![1.5, -2.5]);
        assert!(!loaded.get_parameter("b").unwrap().requires_grad());
    }

    #[test]
    fn test_corrupt_checkpoint_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = checkpoint_path(dir.path(), "corrupt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"{ not json").unwrap();
        drop(file);

        let result = load_checkpoint(dir.path(), "corrupt");
        assert!(result.is_err());
    }
}
