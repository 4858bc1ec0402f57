//! Error types with actionable diagnostics.
//!
//! All errors include enough context to resolve the issue without consulting
//! external documentation. Every fatal condition aborts the current operation;
//! there is no local recovery or retry anywhere in the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for permutar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building datasets, running the model or
/// persisting checkpoints.
#[derive(Error, Debug)]
pub enum Error {
    /// A sequence or permutation disagrees with the configured sizes.
    /// Raised before any tensor is built.
    #[error("Configuration mismatch: {message}\n  → Check group_size / input_length against the dataset files")]
    ConfigMismatch { message: String },

    /// A token fell outside every recognized vocabulary range. This always
    /// indicates a vocabulary-sizing bug and is never coerced.
    #[error("Token {token} outside the vocabulary of size {vocab_size}\n  → The checkpoint or dataset was produced with a different configuration")]
    CodecViolation { token: u32, vocab_size: usize },

    /// Constrained decoding found no unused permutation token at some step.
    /// Unreachable with a well-formed vocabulary; kept as a defensive check.
    #[error("Constrained decoding exhausted the vocabulary at step {step}\n  → This signals a vocabulary-sizing or masking bug, not a recoverable condition")]
    DecodeExhausted { step: usize },

    /// A checkpoint parameter has a different length than the model expects.
    #[error("Parameter '{name}' length mismatch: expected {expected}, got {actual}\n  → The checkpoint was written by a differently configured model")]
    ShapeMismatch { name: String, expected: usize, actual: usize },

    /// Configuration file has invalid values.
    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValue { field: String, message: String },

    /// A dataset table cell could not be parsed as an integer.
    #[error("Failed to parse {path} at line {line}: {message}")]
    Csv { path: PathBuf, line: usize, message: String },

    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Create a configuration-mismatch error.
    pub fn config_mismatch(message: impl Into<String>) -> Self {
        Self::ConfigMismatch { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_mismatch_message() {
        let err = Error::config_mismatch("word length 9 exceeds input_length 6");
        let msg = err.to_string();
        assert!(msg.contains("word length 9"));
        assert!(msg.contains("input_length"));
    }

    #[test]
    fn test_codec_violation_mentions_both_values() {
        let err = Error::CodecViolation { token: 99, vocab_size: 22 };
        let msg = err.to_string();
        assert!(msg.contains("99"));
        assert!(msg.contains("22"));
    }

    #[test]
    fn test_decode_exhausted_names_step() {
        let err = Error::DecodeExhausted { step: 3 };
        assert!(err.to_string().contains("step 3"));
    }

    #[test]
    fn test_io_error_constructor() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io("reading val_data.csv", io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("val_data.csv"));
    }

    #[test]
    fn test_shape_mismatch_is_actionable() {
        let err = Error::ShapeMismatch {
            name: "token_embedding.weight".to_string(),
            expected: 128,
            actual: 256,
        };
        let msg = err.to_string();
        assert!(msg.contains("token_embedding.weight"));
        assert!(msg.contains("128"));
        assert!(msg.contains("256"));
    }
}
