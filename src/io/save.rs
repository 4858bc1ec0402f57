//! Checkpoint saving

use super::model::Model;
use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Path of the checkpoint for a model name.
pub fn checkpoint_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    dir.as_ref().join(format!("{name}.json"))
}

/// Save a model checkpoint, replacing any previous one atomically.
///
/// The state is written to a temporary sibling file and renamed over the
/// final path, so a crash mid-save never corrupts the previous checkpoint.
pub fn save_checkpoint(model: &Model, dir: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .map_err(|e| Error::io(format!("creating checkpoint dir {}", dir.display()), e))?;

    let state = model.to_state();
    let json = serde_json::to_string(&state)
        .map_err(|e| Error::Serialization { message: format!("checkpoint encode failed: {e}") })?;

    let final_path = checkpoint_path(dir, name);
    let tmp_path = dir.join(format!("{name}.json.tmp"));

    {
        let mut file = fs::File::create(&tmp_path)
            .map_err(|e| Error::io(format!("creating {}", tmp_path.display()), e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| Error::io(format!("writing {}", tmp_path.display()), e))?;
        file.sync_all()
            .map_err(|e| Error::io(format!("syncing {}", tmp_path.display()), e))?;
    }

    fs::rename(&tmp_path, &final_path)
        .map_err(|e| Error::io(format!("replacing {}", final_path.display()), e))?;

    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{load_checkpoint, ModelMetadata};
    use crate::Tensor;
    use tempfile::TempDir;

    fn sample_model(name: &str) -> Model {
        Model::new(
            ModelMetadata::new(name, "transformer"),
            vec![("w".to_string(), Tensor::from_vec(vec![1.0, 2.0, 3.0], true))],
        )
    }

    #[test]
    fn test_save_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = save_checkpoint(&sample_model("save-test"), dir.path(), "save-test").unwrap();
        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("save-test"));
    }

    #[test]
    fn test_save_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        save_checkpoint(&sample_model("clean"), dir.path(), "clean").unwrap();
        assert!(!dir.path().join("clean.json.tmp").exists());
    }

    #[test]
    fn test_resave_replaces_previous() {
        let dir = TempDir::new().unwrap();
        save_checkpoint(&sample_model("replace"), dir.path(), "replace").unwrap();

        let updated = Model::new(
            ModelMetadata::new("replace", "transformer"),
            vec![("w".to_string(), Tensor::from_vec(vec![9.0, 9.0, 9.0], true))],
        );
        save_checkpoint(&updated, dir.path(), "replace").unwrap();

        let loaded = load_checkpoint(dir.path(), "replace").unwrap().unwrap();
        assert_eq!(loaded.get_parameter("w").unwrap().to_vec(), vec![9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested/model");
        let path = save_checkpoint(&sample_model("deep"), &nested, "deep").unwrap();
        assert!(path.exists());
    }
}
