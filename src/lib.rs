//! permutar: transformer training for permutation-group word problems
//!
//! Trains small decoder-style transformers to evaluate words in a permutation
//! group: given a sequence of generator symbols, predict the resulting
//! permutation one coordinate at a time (or, in the reversed task, recover the
//! word from the permutation).
//!
//! ## Architecture Components
//!
//! - `group`: permutation algebra (generator application, word evaluation)
//! - `codec`: bidirectional mapping between group symbols and model tokens
//! - `dataset`: fixed-length training rows for the simple, masked and
//!   reversed task framings, plus the CSV table loader
//! - `autograd`: tape-based automatic differentiation engine
//! - `model`: the transformer (embeddings, masked attention, blocks, head)
//! - `generate`: greedy / constrained autoregressive decoding
//! - `train` / `optim`: cross-entropy training with AdamW and LR scheduling
//! - `io`: atomic JSON checkpoints
//!
//! ## Example
//!
//! ```
//! use permutar::config::{TaskConfig, TranspositionScheme};
//! use permutar::group::evaluate;
//!
//! let config = TaskConfig::tiny();
//! let perm = evaluate(&[1, 2, 1], config.group_size, config.scheme).unwrap();
//! assert_eq!(perm, vec![2, 1, 0, 3]);
//! assert_eq!(config.scheme, TranspositionScheme::Elementary);
//! ```

pub mod autograd;
pub mod cli;
pub mod codec;
pub mod config;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod generate;
pub mod group;
pub mod io;
pub mod model;
pub mod optim;
pub mod train;

pub use autograd::Tensor;
pub use error::{Error, Result};
